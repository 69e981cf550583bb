use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use actix_web::{http::uri::Builder, middleware::Logger, web, App, HttpRequest, HttpResponse, HttpServer};
use anyhow::Context;
use futures::future::select_all;
use prometheus::{Registry, TextEncoder};
use tokio::signal;

use crate::tracing::init_tracing;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

const DEFAULT_BIND_ADDR: &str = "[::1]:9010";

/// Infrastructure
#[derive(Clone, Debug, clap::Args)]
#[command(rename_all_env = "SCREAMING_SNAKE_CASE", next_help_heading = "Infrastructure")]
pub struct InfrastructureConfig {
    /// Enable the infrastructure endpoint
    #[arg(env, long)]
    pub infrastructure_enabled: bool,
    /// Bind addresses of the infrastructure endpoint
    #[arg(long, env, default_value_t = DEFAULT_BIND_ADDR.into())]
    pub infrastructure_bind: String,
    /// Number of workers
    #[arg(long, env, default_value = "1")]
    pub infrastructure_workers: usize,
    /// Enable tracing
    #[arg(long, env)]
    pub enable_tracing: bool,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            infrastructure_enabled: false,
            infrastructure_bind: DEFAULT_BIND_ADDR.into(),
            infrastructure_workers: 1,
            enable_tracing: false,
        }
    }
}

/// Handed to the main function of a service.
#[derive(Clone)]
pub struct MainContext {
    pub metrics: Arc<Metrics>,
    pub health: Arc<Health>,
}

/// Readiness of the main function, reported on `/health/ready`.
#[derive(Debug, Default)]
pub struct Health {
    ready: AtomicBool,
}

impl Health {
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
pub struct Metrics {
    registry: Registry,
}

impl Metrics {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

async fn index(req: HttpRequest) -> HttpResponse {
    let conn = req.connection_info();

    let apis = ["/health/live", "/health/ready", "/health/startup", "/metrics"]
        .into_iter()
        .filter_map(|api| {
            Builder::new()
                .authority(conn.host())
                .scheme(conn.scheme())
                .path_and_query(api)
                .build()
                .ok()
                .map(|uri| uri.to_string())
        })
        .collect::<Vec<_>>();

    HttpResponse::Ok().json(apis)
}

async fn live() -> HttpResponse {
    HttpResponse::Ok().finish()
}

async fn ready(health: web::Data<Health>) -> HttpResponse {
    match health.is_ready() {
        true => HttpResponse::Ok().finish(),
        false => HttpResponse::ServiceUnavailable().body("not ready"),
    }
}

async fn metrics(metrics: web::Data<Metrics>) -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = metrics.registry().gather();
    match encoder.encode_to_string(&metric_families) {
        Ok(data) => HttpResponse::Ok().content_type("text/plain").body(data),
        Err(e) => HttpResponse::InternalServerError().body(format!("Error retrieving metrics: {:?}", e)),
    }
}

pub(crate) fn configure_endpoint(svc: &mut web::ServiceConfig, context: &MainContext) {
    svc.app_data(web::Data::from(context.metrics.clone()))
        .app_data(web::Data::from(context.health.clone()))
        .service(web::resource("/").to(index))
        .service(
            web::scope("/health")
                .service(web::resource("/live").to(live))
                .service(web::resource("/ready").to(ready))
                .service(web::resource("/startup").to(live)),
        )
        .service(web::resource("/metrics").to(metrics));
}

type Task = Pin<Box<dyn Future<Output = anyhow::Result<()>>>>;

#[derive(Default)]
pub struct Infrastructure {
    config: InfrastructureConfig,
    context: Option<MainContext>,
}

impl From<InfrastructureConfig> for Infrastructure {
    fn from(config: InfrastructureConfig) -> Self {
        Self { config, context: None }
    }
}

impl Infrastructure {
    /// create a new instance, with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    fn context(&mut self) -> MainContext {
        self.context
            .get_or_insert_with(|| MainContext {
                metrics: Default::default(),
                health: Default::default(),
            })
            .clone()
    }

    async fn start_endpoint(&self, context: MainContext) -> anyhow::Result<Task> {
        if !self.config.infrastructure_enabled {
            log::info!("Infrastructure endpoint is disabled");
            return Ok(Box::pin(futures::future::pending::<anyhow::Result<()>>()));
        }

        log::info!("Setting up infrastructure endpoint");

        let mut http = HttpServer::new(move || {
            App::new()
                .wrap(Logger::default())
                .configure(|svc| configure_endpoint(svc, &context))
        });

        if self.config.infrastructure_workers > 0 {
            http = http.workers(self.config.infrastructure_workers);
        }

        http = http
            .bind(&self.config.infrastructure_bind)
            .context("Failed to bind infrastructure endpoint")?;

        Ok(Box::pin(async move {
            log::info!("Running infrastructure endpoint on:");
            for (addr, scheme) in http.addrs_with_scheme() {
                log::info!("   {scheme}://{addr}");
            }
            http.run().await.context("Failed to run infrastructure endpoint")?;
            Ok::<_, anyhow::Error>(())
        }))
    }

    /// Run the main function of a service, next to the infrastructure endpoint.
    ///
    /// Returns when the main function returns, the infrastructure endpoint fails, or the process
    /// receives a termination signal.
    pub async fn run<F, Fut>(mut self, id: &str, main: F) -> anyhow::Result<()>
    where
        F: FnOnce(MainContext) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        init_tracing(id, self.config.enable_tracing.into());

        let context = self.context();
        let endpoint = self.start_endpoint(context.clone()).await?;
        let main = Box::pin(main(context)) as Task;
        let sigint = Box::pin(async { signal::ctrl_c().await.context("termination failed") }) as Task;

        #[allow(unused_mut)]
        let mut tasks = vec![endpoint, main, sigint];

        #[cfg(unix)]
        {
            let sigterm = Box::pin(async {
                signal(SignalKind::terminate())?.recv().await;
                log::info!("Received SIGTERM, shutting down");
                Ok::<_, anyhow::Error>(())
            }) as Task;
            tasks.push(sigterm);
        }

        let (result, _index, _others) = select_all(tasks).await;
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn readiness_follows_health() {
        let context = Infrastructure::new().context();
        let app = test::init_service(App::new().configure(|svc| configure_endpoint(svc, &context))).await;

        let response = test::call_service(&app, test::TestRequest::get().uri("/health/ready").to_request()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        context.health.set_ready(true);

        let response = test::call_service(&app, test::TestRequest::get().uri("/health/ready").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = test::call_service(&app, test::TestRequest::get().uri("/health/live").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn metrics_are_exposed() {
        let context = Infrastructure::new().context();
        let counter = prometheus::IntCounter::new("test_counter", "a counter").unwrap();
        context.metrics.registry().register(Box::new(counter.clone())).unwrap();
        counter.inc();

        let app = test::init_service(App::new().configure(|svc| configure_endpoint(svc, &context))).await;
        let body = test::call_and_read_body(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("test_counter 1"));
    }
}
