//! Tracing and logging setup.
//!
//! Configures structured logging with:
//! - `RUST_LOG`-style filtering, falling back to the configured level
//! - Human-readable or JSON console output
//! - Optional OTLP span export for distributed tracing

use opentelemetry::trace::{TraceError, TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::Tracer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Service name reported on exported spans.
const SERVICE_NAME: &str = "consign";

/// Initialize tracing.
///
/// This sets up:
/// - Console logging with structured format (JSON if `json` is set)
/// - Environment-based filter (via RUST_LOG, else `log_level`)
/// - An OTLP span exporter when `otel_endpoint` is given
///
/// A failing OTLP exporter is reported and skipped; console logging still
/// comes up.
///
/// # Panics
///
/// Panics if tracing has already been initialized.
pub fn init_tracing(log_level: &str, json: bool, otel_endpoint: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},consign_server=debug,h2=warn")));

    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
    });

    let (otel_layer, otel_error) = match otel_endpoint.map(otlp_tracer) {
        Some(Ok(tracer)) => (Some(tracing_opentelemetry::layer().with_tracer(tracer)), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(otel_layer)
        .init();

    if let Some(e) = otel_error {
        tracing::warn!(error = %e, "Failed to create OTLP span exporter, spans stay local");
    }

    tracing::info!(
        service = SERVICE_NAME,
        otlp = otel_endpoint.unwrap_or("disabled"),
        "Tracing initialized"
    );
}

/// Build a batching OTLP tracer that exports to `endpoint`.
fn otlp_tracer(endpoint: &str) -> Result<Tracer, TraceError> {
    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    opentelemetry::global::set_tracer_provider(provider.clone());
    Ok(provider.tracer(SERVICE_NAME))
}

/// Flush and stop any OTLP span exporter.
pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
}

/// Initialize tracing for tests (only logs errors).
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
}
