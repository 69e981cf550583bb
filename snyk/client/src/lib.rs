//! Drive the asynchronous issue export of Snyk: list organizations, start an export, wait for
//! the export to finish and hand out the URL of the resulting CSV file.

mod client;
mod config;
mod url;

pub mod schema;

pub use self::client::*;
pub use self::config::*;
pub use self::url::*;

use async_trait::async_trait;
use dashboard_model::filters::ExportFilters;
use reqwest::StatusCode;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("upstream responded with {status}: {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] ::url::ParseError),
    #[error("export {export_id} failed")]
    ExportFailed { export_id: String },
    #[error("export {export_id} did not finish within {timeout:?}")]
    PollTimeout { export_id: String, timeout: Duration },
    #[error("export {export_id} finished without any result file")]
    MissingResults { export_id: String },
}

/// A started export, scoped to the organization it was started for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportJob {
    pub id: String,
    pub org_id: String,
}

/// The three steps of an export.
#[async_trait]
pub trait ExportProvider: Send + Sync {
    /// All organizations of the configured group, following pagination.
    async fn list_organizations(&self) -> Result<Vec<String>, Error>;

    /// Start an export. Requires `filters.orgs` to be non-empty.
    async fn initiate_export(&self, filters: &ExportFilters) -> Result<ExportJob, Error>;

    /// Wait for the export to reach a terminal state, returning the URL of the first result file.
    async fn poll_status(&self, job: &ExportJob) -> Result<::url::Url, Error>;
}
