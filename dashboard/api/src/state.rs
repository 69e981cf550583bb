use std::sync::Arc;

use dashboard_aggregator::fetch_report;
use dashboard_model::prelude::{DashboardData, ExportFilters};
use snyk_export_client::ExportProvider;
use tracing::instrument;

use crate::Error;

/// Shared between all requests, nothing in here is mutable.
pub struct AppState {
    provider: Arc<dyn ExportProvider>,
    client: reqwest::Client,
}

impl AppState {
    pub fn new(provider: Arc<dyn ExportProvider>, client: reqwest::Client) -> Self {
        Self { provider, client }
    }

    /// Export the issues matching the filters and aggregate them.
    #[instrument(skip(self), err)]
    pub async fn dashboard(&self, mut filters: ExportFilters) -> Result<DashboardData, Error> {
        if filters.orgs.is_empty() {
            log::info!("No organizations requested, exporting all organizations of the group");
            filters.orgs = self
                .provider
                .list_organizations()
                .await
                .map_err(Error::Organizations)?;
        }

        let job = self.provider.initiate_export(&filters).await.map_err(Error::Initiate)?;
        let url = self.provider.poll_status(&job).await.map_err(Error::Export)?;

        Ok(fetch_report(&self.client, url).await?)
    }
}
