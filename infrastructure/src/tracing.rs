use opentelemetry::propagation::Injector;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing_bunyan_formatter::BunyanFormattingLayer;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tracing {
    #[default]
    Disabled,
    Jaeger,
}

impl From<bool> for Tracing {
    fn from(enable: bool) -> Self {
        match enable {
            true => Tracing::Jaeger,
            false => Tracing::Disabled,
        }
    }
}

/// Sampling ratio, from `OTEL_TRACES_SAMPLER_ARG`, falling back to 0.1%.
fn sampling_ratio() -> f64 {
    std::env::var("OTEL_TRACES_SAMPLER_ARG")
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .unwrap_or(0.001)
}

pub fn init_tracing(name: &str, tracing: Tracing) {
    match tracing {
        Tracing::Disabled => init_no_tracing(),
        Tracing::Jaeger => init_jaeger(name),
    }
}

fn init_jaeger(name: &str) {
    use opentelemetry::sdk::trace::{Config, Sampler};
    use tracing_subscriber::prelude::*;

    opentelemetry::global::set_text_map_propagator(opentelemetry::sdk::propagation::TraceContextPropagator::new());
    let pipeline = opentelemetry_jaeger::new_agent_pipeline()
        .with_service_name(name)
        .with_auto_split_batch(true)
        .with_trace_config(
            Config::default().with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                sampling_ratio(),
            )))),
        );

    let tracer = match pipeline.install_batch(opentelemetry::runtime::Tokio) {
        Ok(tracer) => tracer,
        Err(e) => {
            eprintln!("Error installing Jaeger pipeline, falling back to plain logging: {e}");
            return init_no_tracing();
        }
    };

    println!("Tracing is enabled. This console will not show any logging information.");

    let formatting_layer = BunyanFormattingLayer::new(name.to_string(), std::io::stdout);

    if let Err(e) = tracing_subscriber::Registry::default()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(formatting_layer)
        .try_init()
    {
        eprintln!("Error initializing tracing: {:?}", e);
    }
}

fn init_no_tracing() {
    if let Err(e) = env_logger::builder().format_timestamp_millis().try_init() {
        eprintln!("Error initializing logging: {:?}", e);
    }
}

struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(&value)) {
            self.0.insert(name, value);
        }
    }
}

/// Forward the trace context of the current span to an outgoing request.
///
/// Without an installed propagator (tracing disabled) this adds no headers.
pub trait PropagateCurrentContext {
    fn propagate_current_context(self) -> Self;
}

impl PropagateCurrentContext for reqwest::RequestBuilder {
    fn propagate_current_context(self) -> Self {
        use tracing_opentelemetry::OpenTelemetrySpanExt;

        let context = tracing::Span::current().context();
        let mut headers = HeaderMap::new();
        opentelemetry::global::get_text_map_propagator(|propagator| {
            propagator.inject_context(&context, &mut HeaderInjector(&mut headers))
        });

        self.headers(headers)
    }
}
