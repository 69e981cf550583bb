use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Number of projects reported as the riskiest ones.
pub const TOP_PROJECTS: usize = 5;

/// Issue counts of a single project.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    /// Name of the project
    pub name: String,
    /// Number of issues with a critical severity
    pub critical_issue_count: u64,
    /// Number of issues with a high severity
    pub high_issue_count: u64,
}

impl ProjectInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// The aggregated metrics shown on the dashboard.
///
/// Maps only contain keys which have been observed in the export.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    /// Issue count per (lowercase) severity
    pub issues_by_severity: BTreeMap<String, u64>,
    /// Issue count per project environment
    pub issues_by_environment: BTreeMap<String, u64>,
    /// Number of critical issues which can be fixed
    pub fixable_critical_issues: u64,
    /// Up to five projects, ordered by critical, then high issue count
    #[serde(rename = "top5RiskiestProjects")]
    pub top_riskiest_projects: Vec<ProjectInfo>,
}
