use crate::tls::ClientConfig;
use anyhow::Context;

impl ClientConfig {
    /// Build a new client, applying TLS settings and the request timeout.
    ///
    /// The client is cheap to clone and shares its connection pool, so a service should build it once.
    pub fn build_client(&self) -> anyhow::Result<reqwest::Client> {
        let mut client = reqwest::Client::builder().timeout(self.timeout);

        if self.tls_insecure {
            log::warn!("Disabling TLS verification for client. Do not use this in production!");
            client = client
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        for cert in self.certificates() {
            let pem = std::fs::read(cert).with_context(|| format!("Reading certificate: {cert}"))?;
            let cert = reqwest::Certificate::from_pem(&pem).context("Parsing certificate")?;
            client = client.add_root_certificate(cert);
        }

        client.build().context("Create HTTP client")
    }
}

#[cfg(test)]
mod test {
    use crate::tls::ClientConfig;

    #[test]
    fn default_client() {
        assert!(ClientConfig::default().build_client().is_ok());
    }

    #[test]
    fn missing_certificate() {
        let config = ClientConfig {
            ca_certificates: vec!["/does/not/exist.pem".into()],
            ..Default::default()
        };
        assert!(config.build_client().is_err());
    }
}
