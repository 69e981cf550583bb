use dashboard_model::prelude::ExportFilters;
use integration_tests::{fast_polling, snyk_config, MockConfig, MockSnyk, StatusReply, EXPORT_ID, TOKEN};
use snyk_export_client::{Error, ExportScope, SnykClient};
use std::time::Duration;

fn client(mock: &MockSnyk, scope: ExportScope, timeout: Duration) -> SnykClient {
    SnykClient::new(reqwest::Client::new(), snyk_config(mock, scope), fast_polling(timeout))
}

fn filters() -> ExportFilters {
    ExportFilters {
        orgs: vec!["o1".into(), "o2".into()],
        ..Default::default()
    }
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn follows_pagination() {
    let mock = MockSnyk::start(MockConfig::default());
    let orgs = client(&mock, ExportScope::Org, Duration::from_secs(5))
        .list_organizations()
        .await
        .unwrap();

    assert_eq!(orgs, vec!["o1", "o2", "o3"]);

    let requests = mock.requests_to("GET", "/rest/groups/g1/orgs");
    assert_eq!(requests.len(), 2);
    assert!(requests[0].query.contains("limit=100"));
    assert!(requests[1].query.contains("page=1"));
    assert_eq!(requests[0].authorization.as_deref(), Some(format!("token {TOKEN}").as_str()));
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn listing_failure_is_upstream_error() {
    let mock = MockSnyk::start(MockConfig {
        orgs_failure: Some(403),
        ..Default::default()
    });
    let result = client(&mock, ExportScope::Org, Duration::from_secs(5))
        .list_organizations()
        .await;

    match result {
        Err(Error::Upstream { status, body }) => {
            assert_eq!(status.as_u16(), 403);
            assert_eq!(body, "mock failure");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn org_export_finishes() {
    let mock = MockSnyk::start(MockConfig::default());
    let client = client(&mock, ExportScope::Org, Duration::from_secs(5));

    let job = client.initiate_export(&filters()).await.unwrap();
    assert_eq!(job.id, EXPORT_ID);
    assert_eq!(job.org_id, "o1");

    let url = client.poll_status(&job).await.unwrap();
    assert_eq!(url.path(), format!("/files/{EXPORT_ID}.csv"));

    let initiated = mock.requests_to("POST", "/rest/orgs/o1/export");
    assert_eq!(initiated.len(), 1);
    assert_eq!(initiated[0].content_type.as_deref(), Some("application/vnd.api+json"));
    let body = initiated[0].body.as_ref().unwrap();
    assert_eq!(body["data"]["attributes"]["dataset"], "issues");
    assert_eq!(body["data"]["attributes"]["formats"][0], "csv");

    assert_eq!(mock.requests_to("GET", "/rest/orgs/o1/jobs/export/").len(), 2);
    assert_eq!(mock.requests_to("GET", &format!("/rest/orgs/o1/export/{EXPORT_ID}")).len(), 1);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn group_export_finishes() {
    let mock = MockSnyk::start(MockConfig {
        statuses: vec![StatusReply::Status("FINISHED")],
        ..Default::default()
    });
    let client = client(&mock, ExportScope::Group, Duration::from_secs(5));

    let job = client.initiate_export(&filters()).await.unwrap();
    let url = client.poll_status(&job).await.unwrap();
    assert_eq!(url.path(), format!("/files/{EXPORT_ID}.csv"));

    let initiated = mock.requests_to("POST", "/rest/groups/g1/exports");
    assert_eq!(initiated.len(), 1);
    let body = initiated[0].body.as_ref().unwrap();
    assert_eq!(body["data"]["attributes"]["filters"]["orgs"], serde_json::json!(["o1", "o2"]));
    assert_eq!(body["data"]["attributes"]["destination"]["type"], "snyk");
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn transient_failures_keep_polling() {
    let mock = MockSnyk::start(MockConfig {
        statuses: vec![
            StatusReply::Fail(502),
            StatusReply::Status("PENDING"),
            StatusReply::Fail(500),
            StatusReply::Status("FINISHED"),
        ],
        ..Default::default()
    });
    let client = client(&mock, ExportScope::Org, Duration::from_secs(5));

    let job = client.initiate_export(&filters()).await.unwrap();
    assert!(client.poll_status(&job).await.is_ok());
    assert_eq!(mock.requests_to("GET", "/rest/orgs/o1/jobs/export/").len(), 4);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn error_status_fails() {
    let mock = MockSnyk::start(MockConfig {
        statuses: vec![StatusReply::Status("PENDING"), StatusReply::Status("ERROR")],
        ..Default::default()
    });
    let client = client(&mock, ExportScope::Org, Duration::from_secs(5));

    let job = client.initiate_export(&filters()).await.unwrap();
    let result = client.poll_status(&job).await;
    assert!(matches!(result, Err(Error::ExportFailed { ref export_id }) if export_id == EXPORT_ID));
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn pending_forever_times_out() {
    let mock = MockSnyk::start(MockConfig {
        statuses: vec![StatusReply::Status("PENDING")],
        ..Default::default()
    });
    let client = client(&mock, ExportScope::Org, Duration::from_millis(500));

    let job = client.initiate_export(&filters()).await.unwrap();
    let result = client.poll_status(&job).await;
    assert!(matches!(result, Err(Error::PollTimeout { .. })), "{result:?}");
    assert!(!mock.requests_to("GET", "/rest/orgs/o1/jobs/export/").is_empty());
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn finished_without_results() {
    let mock = MockSnyk::start(MockConfig {
        statuses: vec![StatusReply::Status("FINISHED")],
        with_results: false,
        ..Default::default()
    });

    for scope in [ExportScope::Org, ExportScope::Group] {
        let client = client(&mock, scope, Duration::from_secs(5));
        let job = client.initiate_export(&filters()).await.unwrap();
        let result = client.poll_status(&job).await;
        assert!(matches!(result, Err(Error::MissingResults { .. })), "{scope:?}: {result:?}");
    }
}
