//! Outbound client configuration.

use std::path::Path;
use std::time::Duration;

/// The default path to OpenShift's Service CA certificate.
pub const SERVICE_CA_CERT: &str = "/var/run/secrets/kubernetes.io/serviceaccount/service-ca.crt";

/// Configuration of the HTTP client used to talk to upstream services.
#[derive(Clone, Debug, PartialEq, Eq, clap::Args)]
#[command(rename_all_env = "SCREAMING_SNAKE_CASE", next_help_heading = "Client")]
pub struct ClientConfig {
    /// Disable TLS verification of upstream services. Do not use this in production!
    #[arg(id = "client-tls-insecure", long = "tls-insecure", env = "CLIENT_TLS_INSECURE")]
    pub tls_insecure: bool,

    /// Additional CA certificates (PEM files) to trust
    #[arg(
        id = "client-tls-ca-certificates",
        long = "tls-ca-certificate",
        env = "CLIENT_TLS_CA_CERTIFICATES",
        value_delimiter = ','
    )]
    pub ca_certificates: Vec<String>,

    /// Timeout of a single upstream request
    #[arg(
        id = "client-timeout",
        long = "client-timeout",
        env = "CLIENT_TIMEOUT",
        default_value = "60s",
        value_parser = humantime::parse_duration
    )]
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tls_insecure: false,
            ca_certificates: vec![],
            timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    pub fn certificates(&self) -> impl Iterator<Item = &str> {
        let service_ca = {
            let cert = Path::new(SERVICE_CA_CERT);
            if cert.exists() {
                log::info!("Adding Service CA certificate ({:?})", cert);
                Some(SERVICE_CA_CERT)
            } else {
                None
            }
        };

        self.ca_certificates
            .iter()
            .map(|s| s.as_str())
            .chain(service_ca)
    }
}
