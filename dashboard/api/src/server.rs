use std::net::TcpListener;
use std::sync::Arc;

use actix_web::http::header::{self, ContentType};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use chrono::Utc;
use dashboard_model::prelude::{DashboardData, ProjectInfo};
use nis2dash_infrastructure::app::http::{HttpServerBuilder, HttpServerConfig};
use nis2dash_infrastructure::MainContext;
use tracing::instrument;
use utoipa::OpenApi;

use crate::{AppState, DataQuery};

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "dashboard")
    ),
    paths(
        get_data,
    ),
    components(
        schemas(
            DashboardData,
            ProjectInfo,
        )
    )
)]
pub struct ApiDoc;

pub async fn run(
    state: Arc<AppState>,
    http: HttpServerConfig,
    context: MainContext,
    listener: Option<TcpListener>,
) -> anyhow::Result<()> {
    let state = web::Data::from(state);

    let mut http = HttpServerBuilder::try_from(http)?
        .metrics(context.metrics.registry().clone(), "dashboard")
        .configure(move |svc| {
            svc.app_data(state.clone()).configure(config);
        });

    if let Some(listener) = listener {
        http = http.listen(listener);
    }

    let server = http.start()?;
    context.health.set_ready(true);

    Ok(server.await?)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/data")
            .route(web::get().to(get_data))
            .default_service(web::to(method_not_allowed)),
    )
    .service(web::resource("/openapi.json").route(web::get().to(openapi)));
}

/// Failure of one of the stages producing the dashboard data.
///
/// Only the stage is reported to the caller, the cause is logged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to list organizations: {0}")]
    Organizations(#[source] snyk_export_client::Error),
    #[error("failed to initiate export: {0}")]
    Initiate(#[source] snyk_export_client::Error),
    #[error("failed to complete export: {0}")]
    Export(#[source] snyk_export_client::Error),
    #[error("failed to process export: {0}")]
    Report(#[from] dashboard_aggregator::Error),
}

impl Error {
    fn message(&self) -> &'static str {
        match self {
            Self::Organizations(_) => "Failed to fetch Snyk organizations",
            Self::Initiate(_) => "Failed to initiate Snyk export",
            Self::Export(_) => "Failed to complete Snyk export",
            Self::Report(_) => "Failed to process exported Snyk data",
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        log::error!("{self}");
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(self.message())
    }
}

#[utoipa::path(
    get,
    path = "/api/data",
    tag = "dashboard",
    params(DataQuery),
    responses(
        (status = 200, description = "Aggregated issues of the export", body = DashboardData),
        (status = 500, description = "Exporting or aggregating the issues failed", body = String),
    )
)]
#[instrument(skip_all, fields(query = req.query_string()), err)]
pub async fn get_data(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, Error> {
    let filters = DataQuery::parse(req.query_string()).into_filters(Utc::now());
    let data = state.dashboard(filters).await?;

    log::info!(
        "Returning {} severities and {} projects",
        data.issues_by_severity.len(),
        data.top_riskiest_projects.len()
    );

    Ok(HttpResponse::Ok().json(data))
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed()
        .insert_header((header::ALLOW, "GET"))
        .insert_header(ContentType::plaintext())
        .body("Method Not Allowed")
}

async fn openapi() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}
