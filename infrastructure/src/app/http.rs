use crate::app::{new_app, AppOptions};
use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::web::JsonConfig;
use actix_web::{web, web::ServiceConfig, HttpServer};
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use anyhow::{anyhow, Context};
use prometheus::Registry;
use std::fmt::Debug;
use std::net::{IpAddr, Ipv6Addr, SocketAddr, TcpListener};
use std::str::FromStr;
use std::sync::Arc;

const DEFAULT_ADDR: SocketAddr = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 8080);

#[derive(Clone, Debug, clap::Args)]
#[command(rename_all_env = "SCREAMING_SNAKE_CASE", next_help_heading = "HTTP endpoint")]
pub struct HttpServerConfig {
    /// The number of worker threads, defaults to zero, which falls back to the number of cores.
    #[arg(id = "http-server-workers", long, env = "HTTP_SERVER_WORKERS", default_value_t = 0)]
    pub workers: usize,

    /// The bind address
    #[arg(
        id = "http-server-bind",
        long = "http-server-bind-addr",
        env = "HTTP_SERVER_BIND_ADDR",
        default_value = "[::]:8080"
    )]
    pub bind_addr: String,

    /// Override the port of the bind address
    #[arg(id = "http-server-port", long = "port", env = "PORT")]
    pub port: Option<u16>,

    /// The overall request limit
    #[arg(
        id = "http-server-request-limit",
        long,
        env = "HTTP_SERVER_REQUEST_LIMIT",
        default_value = "256KiB"
    )]
    pub request_limit: bytesize::ByteSize,

    /// The JSON request limit
    #[arg(
        id = "http-server-json-limit",
        long,
        env = "HTTP_SERVER_JSON_LIMIT",
        default_value = "2MiB"
    )]
    pub json_limit: bytesize::ByteSize,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            bind_addr: DEFAULT_ADDR.to_string(),
            port: None,
            request_limit: bytesize::ByteSize::kib(256),
            json_limit: bytesize::ByteSize::mib(2),
        }
    }
}

impl HttpServerConfig {
    /// The address to bind to, with the port override applied.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let mut addr = SocketAddr::from_str(&self.bind_addr).context("parse bind address")?;
        if let Some(port) = self.port {
            addr.set_port(port);
        }
        Ok(addr)
    }
}

impl TryFrom<HttpServerConfig> for HttpServerBuilder {
    type Error = anyhow::Error;

    fn try_from(value: HttpServerConfig) -> Result<Self, Self::Error> {
        Ok(HttpServerBuilder::new()
            .workers(value.workers)
            .bind(value.socket_addr()?)
            .request_limit(value.request_limit.0 as _)
            .json_limit(value.json_limit.0 as _))
    }
}

pub type ConfiguratorFn = dyn Fn(&mut ServiceConfig) + Send + Sync;

/// Builds the HTTP server of a service, created from a [`HttpServerConfig`].
///
/// CORS is always permissive.
pub struct HttpServerBuilder {
    configurator: Option<Arc<ConfiguratorFn>>,
    bind: Bind,
    metrics_factory: Option<Arc<dyn Fn() -> anyhow::Result<PrometheusMetrics> + Send + Sync>>,

    workers: usize,
    json_limit: Option<usize>,
    request_limit: Option<usize>,
}

pub enum Bind {
    Listener(TcpListener),
    Plain(SocketAddr),
}

impl HttpServerBuilder {
    fn new() -> Self {
        Self {
            configurator: None,
            bind: Bind::Plain(DEFAULT_ADDR),
            metrics_factory: None,
            workers: 0,
            json_limit: None,
            request_limit: None,
        }
    }

    pub fn configure<F>(mut self, configurator: F) -> Self
    where
        F: Fn(&mut ServiceConfig) + Send + Sync + 'static,
    {
        self.configurator = Some(Arc::new(configurator));
        self
    }

    /// Record request metrics into the provided registry.
    pub fn metrics(mut self, registry: impl Into<Registry>, namespace: impl AsRef<str>) -> Self {
        let metrics = PrometheusMetricsBuilder::new(namespace.as_ref())
            .registry(registry.into())
            .build();

        self.metrics_factory = Some(Arc::new(move || {
            metrics.as_ref().map(|r| r.clone()).map_err(|err| anyhow!("{err}"))
        }));

        self
    }

    pub fn listen(mut self, listener: TcpListener) -> Self {
        self.bind = Bind::Listener(listener);
        self
    }

    pub fn bind(mut self, addr: impl Into<SocketAddr>) -> Self {
        self.bind = Bind::Plain(addr.into());
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn json_limit(mut self, json_limit: usize) -> Self {
        self.json_limit = Some(json_limit);
        self
    }

    pub fn request_limit(mut self, request_limit: usize) -> Self {
        self.request_limit = Some(request_limit);
        self
    }

    /// Bind the server.
    ///
    /// Once this returns, connections to the bound address are queued. The returned server
    /// serves them when awaited.
    pub fn start(self) -> anyhow::Result<Server> {
        let metrics = self.metrics_factory.as_ref().map(|factory| (factory)()).transpose()?;

        let mut http = HttpServer::new(move || {
            let config = self.configurator.clone();

            let cors = Some(Cors::permissive());

            let mut json = JsonConfig::default();
            if let Some(limit) = self.json_limit {
                json = json.limit(limit);
            }

            let mut app = new_app(AppOptions {
                cors,
                metrics: metrics.clone(),
            });

            if let Some(limit) = self.request_limit {
                app = app.app_data(web::PayloadConfig::new(limit));
            }

            app.app_data(json).configure(|svc| {
                if let Some(config) = config {
                    config(svc);
                }
            })
        });

        if self.workers > 0 {
            http = http.workers(self.workers);
        }

        match self.bind {
            Bind::Listener(listener) => {
                log::info!("Binding to provided listener: {listener:?}");
                http = http.listen(listener).context("Binding to listener")?;
            }
            Bind::Plain(addr) => {
                log::info!("Binding to: {addr}");
                http = http.bind(addr)?;
            }
        }

        Ok(http.run())
    }
}
