use std::net::TcpListener;
use std::process::ExitCode;
use std::sync::Arc;

use nis2dash_common::tls::ClientConfig;
use nis2dash_infrastructure::app::http::HttpServerConfig;
use nis2dash_infrastructure::{Infrastructure, InfrastructureConfig};
use snyk_export_client::{ExportProvider, PollConfig, SnykClient, SnykConfig};

mod query;
mod server;
mod state;

pub use query::DataQuery;
pub use server::{config, ApiDoc, Error};
pub use state::AppState;

#[derive(clap::Args, Debug)]
#[command(about = "Run the dashboard API server", args_conflicts_with_subcommands = true)]
pub struct Run {
    #[command(flatten)]
    pub snyk: SnykConfig,

    #[command(flatten)]
    pub poll: PollConfig,

    #[command(flatten)]
    pub infra: InfrastructureConfig,

    #[command(flatten)]
    pub client: ClientConfig,

    #[command(flatten)]
    pub http: HttpServerConfig,
}

impl Run {
    /// Run the server, on the provided listener if present, on the configured address otherwise.
    pub async fn run(self, listener: Option<TcpListener>) -> anyhow::Result<ExitCode> {
        Infrastructure::from(self.infra.clone())
            .run("dashboard-api", move |context| async move {
                log::info!("Snyk API: {}", self.snyk.api_base_url);
                log::info!("Export scope: {:?}", self.snyk.export_scope);

                let state = Self::configure(&self.client, self.snyk, self.poll)?;
                server::run(state, self.http, context, listener).await
            })
            .await?;

        Ok(ExitCode::SUCCESS)
    }

    fn configure(client: &ClientConfig, snyk: SnykConfig, poll: PollConfig) -> anyhow::Result<Arc<AppState>> {
        let client = client.build_client()?;
        let provider: Arc<dyn ExportProvider> = Arc::new(SnykClient::new(client.clone(), snyk, poll));

        Ok(Arc::new(AppState::new(provider, client)))
    }
}
