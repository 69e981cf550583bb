use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::Logger,
    App, Error,
};
use actix_web_extras::middleware::Condition;
use actix_web_prom::PrometheusMetrics;

pub mod http;

#[derive(Default)]
pub struct AppOptions {
    pub cors: Option<Cors>,
    pub metrics: Option<PrometheusMetrics>,
}

/// Build a new HTTP app in a consistent way.
///
/// Middleware runs in the reverse order of being added, so the logger (added last) sees every
/// request first, then metrics, then CORS, which may answer preflight requests on its own.
pub fn new_app(
    options: AppOptions,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap(Condition::from_option(options.cors))
        .wrap(Condition::from_option(options.metrics))
        .wrap(Logger::default())
}
