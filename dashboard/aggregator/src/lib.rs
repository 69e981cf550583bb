//! Fold an issue export (CSV) into [`DashboardData`].

mod accumulator;
mod columns;

pub use accumulator::*;
pub use columns::*;

use dashboard_model::prelude::DashboardData;
use futures::TryStreamExt;
use nis2dash_common::upstream::truncate_body;
use nis2dash_infrastructure::tracing::PropagateCurrentContext;
use reqwest::StatusCode;
use std::io;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::instrument;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("export is missing the required column {column}")]
    Schema { column: &'static str },
    #[error("failed to read export: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to download export: {0}")]
    Download(#[from] reqwest::Error),
    #[error("download responded with {status}: {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("aggregation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Aggregate a CSV export.
///
/// Rows with fewer fields than the header, or which can't be parsed at all, are skipped.
pub fn aggregate<R: io::Read>(reader: R) -> Result<DashboardData, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns = Columns::resolve(reader.headers()?)?;

    let mut acc = Accumulator::new();
    let mut rows = 0usize;
    let mut skipped = 0usize;

    for (idx, record) in reader.records().enumerate() {
        rows += 1;
        // the header is the first line
        let line = idx + 2;

        let record = match record {
            Ok(record) => record,
            Err(err) => match err.kind() {
                csv::ErrorKind::Io(_) => return Err(err.into()),
                _ => {
                    log::warn!("Skipping unreadable row {line}: {err}");
                    skipped += 1;
                    continue;
                }
            },
        };

        match columns.issue(&record) {
            Some(issue) => acc = acc.apply(issue),
            None => {
                log::warn!("Skipping malformed row {line}: {} fields", record.len());
                skipped += 1;
            }
        }
    }

    log::info!("Aggregated {} of {rows} rows, skipped {skipped}", rows - skipped);

    Ok(acc.finish())
}

/// Download an export and aggregate it.
///
/// The body is folded while it arrives, on a blocking thread.
#[instrument(skip(client), err)]
pub async fn fetch_report(client: &reqwest::Client, url: Url) -> Result<DashboardData, Error> {
    let response = client.get(url).propagate_current_context().send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await?;
        return Err(Error::Upstream {
            status,
            body: truncate_body(body),
        });
    }

    let body = response
        .bytes_stream()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err));
    let reader = SyncIoBridge::new(StreamReader::new(Box::pin(body)));

    tokio::task::spawn_blocking(move || aggregate(reader)).await?
}

#[cfg(test)]
mod test {
    use super::*;
    use dashboard_model::prelude::ProjectInfo;

    const EXPORT: &str = "\
ISSUE_SEVERITY,PROJECT_NAME,PROJECT_ENVIRONMENTS,COMPUTED_FIXABILITY
critical,proj1,env1,fixable
high,proj1,env1,
critical,proj2,env2,fixable
";

    #[test]
    fn end_to_end() -> Result<(), Error> {
        let data = aggregate(EXPORT.as_bytes())?;

        assert_eq!(data.issues_by_severity, [("critical".into(), 2), ("high".into(), 1)].into());
        assert_eq!(data.issues_by_environment, [("env1".into(), 2), ("env2".into(), 1)].into());
        assert_eq!(data.fixable_critical_issues, 2);
        assert_eq!(
            data.top_riskiest_projects,
            vec![
                ProjectInfo {
                    name: "proj1".into(),
                    critical_issue_count: 1,
                    high_issue_count: 1,
                },
                ProjectInfo {
                    name: "proj2".into(),
                    critical_issue_count: 1,
                    high_issue_count: 0,
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn short_row_is_like_no_row() -> Result<(), Error> {
        let _ = env_logger::builder().is_test(true).try_init();

        let with_short = aggregate(format!("{EXPORT}low,proj3\n").as_bytes())?;
        let without = aggregate(EXPORT.as_bytes())?;
        assert_eq!(with_short, without);
        Ok(())
    }

    #[test]
    fn longer_rows_are_accepted() -> Result<(), Error> {
        let data = aggregate("ISSUE_SEVERITY,PROJECT_NAME\nlow,proj1,extra\n".as_bytes())?;
        assert_eq!(data.issues_by_severity, [("low".into(), 1)].into());
        Ok(())
    }

    #[test]
    fn quoted_environments() -> Result<(), Error> {
        let data = aggregate("ISSUE_SEVERITY,PROJECT_NAME,PROJECT_ENVIRONMENTS\nlow,p,\"frontend, backend\"\n".as_bytes())?;
        assert_eq!(
            data.issues_by_environment,
            [("backend".into(), 1), ("frontend".into(), 1)].into()
        );
        Ok(())
    }

    #[test]
    fn invalid_utf8_row_is_skipped() -> Result<(), Error> {
        let mut export = b"ISSUE_SEVERITY,PROJECT_NAME\nhigh,p\n".to_vec();
        export.extend_from_slice(b"critical,\xff\xfe\n");
        let data = aggregate(export.as_slice())?;
        assert_eq!(data.issues_by_severity, [("high".into(), 1)].into());
        Ok(())
    }

    #[test]
    fn missing_severity_column() {
        let result = aggregate("PROJECT_NAME,COMPUTED_FIXABILITY\nproj1,fixable\n".as_bytes());
        assert!(matches!(result, Err(Error::Schema { column: ISSUE_SEVERITY })));
    }

    #[test]
    fn empty_export() {
        let result = aggregate("".as_bytes());
        assert!(matches!(result, Err(Error::Schema { .. })));
    }

    #[test]
    fn severity_counts_match_rows() -> Result<(), Error> {
        let mut export = String::from("ISSUE_SEVERITY,PROJECT_NAME\n");
        let severities = ["critical", "high", "", "medium", "low", "", "critical"];
        for (i, severity) in severities.iter().enumerate() {
            export.push_str(&format!("{severity},proj{}\n", i % 3));
        }

        let data = aggregate(export.as_bytes())?;
        let total: u64 = data.issues_by_severity.values().sum();
        assert_eq!(total as usize, severities.iter().filter(|s| !s.is_empty()).count());
        assert_eq!(data.top_riskiest_projects.len(), 3);
        Ok(())
    }
}
