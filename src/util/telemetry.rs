use tracing_subscriber::{prelude::*, EnvFilter, Registry};

/// Fetch the opentelemetry trace id of the current span through the tracing stack
pub fn get_trace_id() -> opentelemetry::trace::TraceId {
    use opentelemetry::trace::TraceContextExt as _;
    use tracing_opentelemetry::OpenTelemetrySpanExt as _;

    tracing::Span::current()
        .context()
        .span()
        .span_context()
        .trace_id()
}

#[cfg(feature = "telemetry")]
async fn init_tracer() -> opentelemetry::sdk::trace::Tracer {
    let otlp_endpoint =
        std::env::var("OPENTELEMETRY_ENDPOINT_URL").expect("Needs an otel collector");

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(otlp_endpoint),
        )
        .with_trace_config(opentelemetry::sdk::trace::config().with_resource(
            opentelemetry::sdk::Resource::new(vec![opentelemetry::KeyValue::new(
                "service.name",
                "llm-operator",
            )]),
        ))
        .install_batch(opentelemetry::runtime::Tokio)
        .expect("valid otlp tracer")
}

/// Initialize tracing
pub async fn init() {
    // Setup tracing layers
    let logger = tracing_subscriber::fmt::layer().compact();
    let env_filter = EnvFilter::try_from_default_env()
        .or(EnvFilter::try_new("info"))
        .unwrap();

    #[cfg(feature = "telemetry")]
    {
        let telemetry = tracing_opentelemetry::layer().with_tracer(init_tracer().await);
        let collector = Registry::default()
            .with(telemetry)
            .with(logger)
            .with(env_filter);
        tracing::subscriber::set_global_default(collector).unwrap();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let collector = Registry::default().with(logger).with(env_filter);
        tracing::subscriber::set_global_default(collector).unwrap();
    }
}
