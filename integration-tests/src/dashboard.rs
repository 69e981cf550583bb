use super::*;
use crate::runner::Runner;
use async_trait::async_trait;
use dashboard_api::Run;
use nis2dash_common::tls::ClientConfig;
use nis2dash_infrastructure::{app::http::HttpServerConfig, InfrastructureConfig};
use reqwest::StatusCode;
use test_context::AsyncTestContext;

/// The dashboard API, running against a [`MockSnyk`].
pub struct DashboardContext {
    pub port: u16,
    pub snyk: MockSnyk,
    _runner: Runner,
}

impl DashboardContext {
    pub fn url(&self, path: &str) -> String {
        format!("http://localhost:{}{path}", self.port)
    }

    pub async fn get_data(&self, query: &str) -> reqwest::Response {
        reqwest::get(self.url(&format!("/api/data{query}")))
            .await
            .expect("request dashboard data")
    }
}

fn dashboard_api(snyk: SnykConfig, poll: PollConfig) -> Run {
    Run {
        snyk,
        poll,
        infra: InfrastructureConfig {
            infrastructure_enabled: false,
            infrastructure_bind: "127.0.0.1:0".into(),
            infrastructure_workers: 1,
            enable_tracing: false,
        },
        client: ClientConfig::default(),
        http: HttpServerConfig {
            workers: 1,
            ..Default::default()
        },
    }
}

pub async fn start_dashboard(config: MockConfig, scope: ExportScope, poll: PollConfig) -> DashboardContext {
    let _ = env_logger::try_init();

    let snyk = MockSnyk::start(config);

    let listener = TcpListener::bind("localhost:0").expect("bind dashboard listener");
    let port = listener.local_addr().expect("dashboard address").port();

    let run = dashboard_api(snyk_config(&snyk, scope), poll);
    let runner = Runner::spawn("dashboard-api", move || async move {
        run.run(Some(listener)).await?;
        Ok(())
    });

    // create the context right away, it cleans up when dropped
    let context = DashboardContext {
        port,
        snyk,
        _runner: runner,
    };

    let client = reqwest::Client::new();
    loop {
        if let Ok(response) = client.get(context.url("/openapi.json")).send().await {
            if response.status() == StatusCode::OK {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    context
}

#[async_trait]
impl AsyncTestContext for DashboardContext {
    async fn setup() -> Self {
        start_dashboard(MockConfig::default(), ExportScope::Org, fast_polling(Duration::from_secs(5))).await
    }
}
