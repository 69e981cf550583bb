//! Wire format of the Snyk REST API (JSON:API style documents).

use serde::{Deserialize, Serialize};

/// Columns requested for every export.
pub const COLUMNS: &[&str] = &[
    "ISSUE_SEVERITY",
    "SCORE",
    "CVE",
    "CWE",
    "ORG_DISPLAY_NAME",
    "PROJECT_NAME",
    "PROJECT_URL",
    "EXPLOIT_MATURITY",
    "COMPUTED_FIXABILITY",
    "FIRST_INTRODUCED",
    "PRODUCT_NAME",
    "ISSUE_URL",
    "ISSUE_STATUS_INDICATOR",
    "ISSUE_TYPE",
    "PROJECT_ENVIRONMENTS",
];

pub const DATASET: &str = "issues";
pub const FORMAT_CSV: &str = "csv";

pub const STATUS_FINISHED: &str = "FINISHED";
pub const STATUS_ERROR: &str = "ERROR";

#[derive(Clone, Debug, Deserialize)]
pub struct Document<T> {
    pub data: T,
    #[serde(default)]
    pub links: Links,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Resource {
    pub id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExportRequest {
    pub data: ExportRequestData,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExportRequestData {
    pub r#type: String,
    pub attributes: ExportAttributes,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExportAttributes {
    pub formats: Vec<String>,
    pub columns: Vec<String>,
    pub dataset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
    pub filters: ExportRequestFilters,
}

#[derive(Clone, Debug, Serialize)]
pub struct Destination {
    pub r#type: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl DateRange {
    fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// The filter keys differ between the org and the group scoped export.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum ExportRequestFilters {
    Org(OrgFilters),
    Group(GroupFilters),
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct OrgFilters {
    #[serde(skip_serializing_if = "DateRange::is_empty")]
    pub introduced: DateRange,
    #[serde(skip_serializing_if = "DateRange::is_empty")]
    pub updated: DateRange,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lifecycle: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub severities: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct GroupFilters {
    pub orgs: Vec<String>,
    #[serde(skip_serializing_if = "DateRange::is_empty")]
    pub introduced: DateRange,
    #[serde(skip_serializing_if = "DateRange::is_empty")]
    pub updated: DateRange,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub project_environment: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub project_lifecycle: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub severities: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExportStatus {
    pub attributes: ExportStatusAttributes,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExportStatusAttributes {
    /// Missing on the results endpoint of the org scoped export.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Option<ExportResults>,
}

/// Older API versions embed a file list, newer ones return the list directly.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ExportResults {
    List(Vec<ExportFile>),
    Files { files: Vec<ExportFile> },
}

impl ExportResults {
    pub fn into_files(self) -> Vec<ExportFile> {
        match self {
            Self::List(files) => files,
            Self::Files { files } => files,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExportFile {
    pub url: String,
}
