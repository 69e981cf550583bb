use super::*;
use crate::runner::Runner;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const TOKEN: &str = "test-token";
pub const GROUP_ID: &str = "g1";
pub const EXPORT_ID: &str = "export-1";

/// The export is sent in chunks of this many bytes.
pub const DOWNLOAD_CHUNK: usize = 7;

/// Reply of a single status request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusReply {
    Status(&'static str),
    Fail(u16),
}

/// Behaviour of the mock provider.
#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Pages of organization IDs.
    pub pages: Vec<Vec<String>>,
    /// Fail listing organizations with this status.
    pub orgs_failure: Option<u16>,
    /// Replies to the status requests, in order. The last one repeats.
    pub statuses: Vec<StatusReply>,
    /// Whether a finished export has a result file.
    pub with_results: bool,
    /// The exported CSV.
    pub csv: String,
    /// Fail downloading the export with this status.
    pub download_failure: Option<u16>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            pages: vec![vec!["o1".into(), "o2".into()], vec!["o3".into()]],
            orgs_failure: None,
            statuses: vec![StatusReply::Status("PENDING"), StatusReply::Status("FINISHED")],
            with_results: true,
            csv: EXPORT_CSV.into(),
            download_failure: None,
        }
    }
}

pub const EXPORT_CSV: &str = "\
ISSUE_SEVERITY,PROJECT_NAME,PROJECT_ENVIRONMENTS,COMPUTED_FIXABILITY
critical,proj1,env1,fixable
high,proj1,env1,
critical,proj2,env2,fixable
";

/// A request received by the mock.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

struct MockState {
    config: MockConfig,
    base: String,
    statuses: Mutex<VecDeque<StatusReply>>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockState {
    fn record(&self, req: &HttpRequest, body: &[u8]) {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(ToString::to_string)
        };

        let recorded = Recorded {
            method: req.method().to_string(),
            path: req.path().to_string(),
            query: req.query_string().to_string(),
            authorization: header("authorization"),
            content_type: header("content-type"),
            body: serde_json::from_slice(body).ok(),
        };
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(recorded);
        }
    }

    fn next_status(&self) -> StatusReply {
        let Ok(mut statuses) = self.statuses.lock() else {
            return StatusReply::Fail(500);
        };
        match statuses.len() {
            0 => StatusReply::Fail(500),
            1 => statuses[0].clone(),
            _ => statuses.pop_front().unwrap_or(StatusReply::Fail(500)),
        }
    }

    fn file_url(&self) -> String {
        format!("{}/files/{EXPORT_ID}.csv", self.base)
    }
}

fn status_code(code: u16) -> HttpResponse {
    HttpResponse::build(actix_web::http::StatusCode::from_u16(code).unwrap_or_default()).body("mock failure")
}

async fn list_orgs(
    state: web::Data<MockState>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    state.record(&req, &[]);

    if let Some(code) = state.config.orgs_failure {
        return status_code(code);
    }

    let group = path.into_inner();
    let page: usize = query.get("page").and_then(|page| page.parse().ok()).unwrap_or(0);
    let data: Vec<Value> = state
        .config
        .pages
        .get(page)
        .map(|orgs| orgs.iter().map(|id| json!({ "id": id, "type": "org" })).collect())
        .unwrap_or_default();

    let mut links = json!({});
    if page + 1 < state.config.pages.len() {
        links["next"] = json!(format!("/rest/groups/{group}/orgs?version=2024-07-29&limit=100&page={}", page + 1));
    }

    HttpResponse::Ok().json(json!({ "data": data, "links": links }))
}

async fn start_export(state: web::Data<MockState>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    state.record(&req, &body);
    HttpResponse::Accepted().json(json!({ "data": { "id": EXPORT_ID, "type": "export" } }))
}

fn results(state: &MockState) -> Value {
    match state.config.with_results {
        true => json!([{ "url": state.file_url(), "file_size": state.config.csv.len() }]),
        false => json!([]),
    }
}

async fn org_status(state: web::Data<MockState>, req: HttpRequest) -> HttpResponse {
    state.record(&req, &[]);
    match state.next_status() {
        StatusReply::Status(status) => {
            HttpResponse::Ok().json(json!({ "data": { "id": EXPORT_ID, "attributes": { "status": status } } }))
        }
        StatusReply::Fail(code) => status_code(code),
    }
}

async fn org_results(state: web::Data<MockState>, req: HttpRequest) -> HttpResponse {
    state.record(&req, &[]);
    HttpResponse::Ok().json(json!({ "data": { "id": EXPORT_ID, "attributes": { "results": results(&state) } } }))
}

async fn group_status(state: web::Data<MockState>, req: HttpRequest) -> HttpResponse {
    state.record(&req, &[]);
    match state.next_status() {
        StatusReply::Status(status) => {
            let mut attributes = json!({ "status": status });
            if status == "FINISHED" {
                attributes["results"] = json!({ "files": results(&state) });
            }
            HttpResponse::Ok().json(json!({ "data": { "id": EXPORT_ID, "attributes": attributes } }))
        }
        StatusReply::Fail(code) => status_code(code),
    }
}

async fn download(state: web::Data<MockState>, req: HttpRequest) -> HttpResponse {
    state.record(&req, &[]);

    if let Some(code) = state.config.download_failure {
        return HttpResponse::build(actix_web::http::StatusCode::from_u16(code).unwrap_or_default())
            .body("no such export ".repeat(100));
    }

    let chunks: Vec<Result<web::Bytes, actix_web::Error>> = state
        .config
        .csv
        .as_bytes()
        .chunks(DOWNLOAD_CHUNK)
        .map(|chunk| Ok(web::Bytes::copy_from_slice(chunk)))
        .collect();
    HttpResponse::Ok()
        .content_type("text/csv")
        .streaming(futures::stream::iter(chunks))
}

/// A mock of the Snyk export API, serving on a random local port.
pub struct MockSnyk {
    pub port: u16,
    state: web::Data<MockState>,
    _runner: Runner,
}

impl MockSnyk {
    pub fn start(config: MockConfig) -> Self {
        let listener = TcpListener::bind("localhost:0").expect("bind mock listener");
        let port = listener.local_addr().expect("mock address").port();

        let state = web::Data::new(MockState {
            statuses: Mutex::new(config.statuses.iter().cloned().collect()),
            config,
            base: format!("http://localhost:{port}"),
            requests: Mutex::new(vec![]),
        });

        let server_state = state.clone();
        let runner = Runner::spawn("mock-snyk", move || async move {
            HttpServer::new(move || {
                App::new()
                    .app_data(server_state.clone())
                    .route("/rest/groups/{group}/orgs", web::get().to(list_orgs))
                    .route("/rest/orgs/{org}/export", web::post().to(start_export))
                    .route("/rest/orgs/{org}/jobs/export/{id}", web::get().to(org_status))
                    .route("/rest/orgs/{org}/export/{id}", web::get().to(org_results))
                    .route("/rest/groups/{group}/exports", web::post().to(start_export))
                    .route("/rest/groups/{group}/exports/{id}", web::get().to(group_status))
                    .route("/files/{file}", web::get().to(download))
            })
            .workers(1)
            .listen(listener)?
            .run()
            .await?;
            Ok(())
        });

        Self {
            port,
            state,
            _runner: runner,
        }
    }

    pub fn url(&self) -> url::Url {
        url::Url::parse(&self.state.base).expect("mock base URL")
    }

    /// Where the finished export can be downloaded.
    pub fn file_url(&self) -> url::Url {
        url::Url::parse(&self.state.file_url()).expect("mock file URL")
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Requests received so far, with a path starting with `prefix`.
    pub fn requests_to(&self, method: &str, prefix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path.starts_with(prefix))
            .collect()
    }
}

/// Client configuration pointing to the mock.
pub fn snyk_config(mock: &MockSnyk, scope: ExportScope) -> SnykConfig {
    SnykConfig {
        token: TOKEN.into(),
        group_id: GROUP_ID.into(),
        api_base_url: mock.url(),
        export_scope: scope,
    }
}

/// Polling fast enough for tests.
pub fn fast_polling(timeout: Duration) -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(50),
        timeout,
    }
}
