use crate::Error;
use csv::StringRecord;

pub const ISSUE_SEVERITY: &str = "ISSUE_SEVERITY";
pub const PROJECT_NAME: &str = "PROJECT_NAME";
pub const PROJECT_ENVIRONMENTS: &str = "PROJECT_ENVIRONMENTS";
pub const COMPUTED_FIXABILITY: &str = "COMPUTED_FIXABILITY";

/// Positions of the columns the aggregation reads, resolved once from the header row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Columns {
    severity: usize,
    project: usize,
    environments: Option<usize>,
    fixability: Option<usize>,
    width: usize,
}

/// The values of a single, well-formed row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Issue<'a> {
    pub severity: &'a str,
    pub project: &'a str,
    /// `None` if the export has no environment column.
    pub environments: Option<&'a str>,
    /// `None` if the export has no fixability column.
    pub fixability: Option<&'a str>,
}

impl Columns {
    pub fn resolve(headers: &StringRecord) -> Result<Self, Error> {
        let position = |column: &str| {
            headers
                .iter()
                .position(|name| name.trim_start_matches('\u{feff}').trim() == column)
        };
        let required = |column: &'static str| position(column).ok_or(Error::Schema { column });

        Ok(Self {
            severity: required(ISSUE_SEVERITY)?,
            project: required(PROJECT_NAME)?,
            environments: position(PROJECT_ENVIRONMENTS),
            fixability: position(COMPUTED_FIXABILITY),
            width: headers.len(),
        })
    }

    /// Extract the issue of a row, `None` if the row has fewer fields than the header.
    pub fn issue<'a>(&self, record: &'a StringRecord) -> Option<Issue<'a>> {
        if record.len() < self.width {
            return None;
        }

        Some(Issue {
            severity: record.get(self.severity)?,
            project: record.get(self.project)?,
            environments: match self.environments {
                Some(idx) => Some(record.get(idx)?),
                None => None,
            },
            fixability: match self.fixability {
                Some(idx) => Some(record.get(idx)?),
                None => None,
            },
        })
    }
}
