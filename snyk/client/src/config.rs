use std::time::Duration;
use url::Url;

/// Which variant of the export API to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportScope {
    /// Export from the first organization, results are read from a separate endpoint.
    #[default]
    Org,
    /// Export across the organizations of the group, results are embedded in the status.
    Group,
}

#[derive(Clone, Debug, clap::Args)]
#[command(next_help_heading = "Snyk")]
pub struct SnykConfig {
    /// API token
    #[arg(id = "snyk-token", long = "snyk-token", env = "SNYK_TOKEN")]
    pub token: String,

    /// Group whose organizations are exported when no organization is requested
    #[arg(id = "snyk-group-id", long = "snyk-group-id", env = "SNYK_GROUP_ID")]
    pub group_id: String,

    /// Base URL of the (regional) API
    #[arg(
        id = "snyk-api-base-url",
        long = "snyk-api-base-url",
        env = "SNYK_API_BASE_URL",
        default_value = "https://api.snyk.io"
    )]
    pub api_base_url: Url,

    #[arg(
        id = "snyk-export-scope",
        long = "snyk-export-scope",
        env = "SNYK_EXPORT_SCOPE",
        value_enum,
        default_value_t = ExportScope::Org
    )]
    pub export_scope: ExportScope,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::Args)]
#[command(next_help_heading = "Polling")]
pub struct PollConfig {
    /// Delay between two status requests
    #[arg(
        id = "poll-interval",
        long = "poll-interval",
        env = "POLL_INTERVAL",
        default_value = "5s",
        value_parser = humantime::parse_duration
    )]
    pub interval: Duration,

    /// Time an export may take before giving up
    #[arg(
        id = "poll-timeout",
        long = "poll-timeout",
        env = "POLL_TIMEOUT",
        default_value = "5m",
        value_parser = humantime::parse_duration
    )]
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(5 * 60),
        }
    }
}
