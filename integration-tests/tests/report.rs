use dashboard_aggregator::{fetch_report, Error};
use integration_tests::{MockConfig, MockSnyk, DOWNLOAD_CHUNK};
use nis2dash_common::upstream::MAX_BODY_LEN;
use reqwest::StatusCode;

#[tokio::test]
#[ntest::timeout(30_000)]
async fn aggregates_chunked_download() {
    let mut csv = String::from("ISSUE_SEVERITY,PROJECT_NAME,PROJECT_ENVIRONMENTS,COMPUTED_FIXABILITY\n");
    for i in 0..2_000 {
        let severity = if i % 4 == 0 { "critical" } else { "high" };
        csv.push_str(&format!("{severity},proj{},\"env{}, shared\",fixable\n", i % 10, i % 3));
    }
    assert!(csv.len() > 100 * DOWNLOAD_CHUNK);

    let mock = MockSnyk::start(MockConfig {
        csv,
        ..Default::default()
    });

    let data = fetch_report(&reqwest::Client::new(), mock.file_url()).await.unwrap();

    assert_eq!(data.issues_by_severity, [("critical".into(), 500), ("high".into(), 1_500)].into());
    assert_eq!(data.issues_by_environment["shared"], 2_000);
    assert_eq!(data.fixable_critical_issues, 500);
    assert_eq!(data.top_riskiest_projects.len(), 5);
    assert_eq!(mock.requests_to("GET", "/files/").len(), 1);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn failed_download_is_upstream_error() {
    let mock = MockSnyk::start(MockConfig {
        download_failure: Some(404),
        ..Default::default()
    });

    match fetch_report(&reqwest::Client::new(), mock.file_url()).await {
        Err(Error::Upstream { status, body }) => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body.chars().count(), MAX_BODY_LEN + 1);
            assert!(body.ends_with('…'));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
