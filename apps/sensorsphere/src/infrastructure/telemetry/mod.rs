//! Logging and OpenTelemetry Tracing
//!
//! Installs the `tracing` subscriber and, when enabled, an OTLP/gRPC trace
//! exporter feeding a `tracing-opentelemetry` layer.
//!
//! The tracer provider is returned as an owned [`Telemetry`] value rather
//! than installed globally, so whoever started it decides when it is
//! flushed. Installing the subscriber a second time (tests, embedding) keeps
//! the existing one.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::infrastructure::config::DEFAULT_OTLP_ENDPOINT;

/// Static filter directives added on top of `RUST_LOG`.
const DIRECTIVES: &[&str] = &["sensorsphere=info", "h2=warn", "hyper=warn", "tower=warn"];

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Export spans over OTLP.
    pub enabled: bool,
    /// OTLP exporter endpoint.
    pub otlp_endpoint: String,
    /// Service and tracer name.
    pub service_name: String,
    /// Pretty log output instead of compact.
    pub development: bool,
}

impl TelemetryConfig {
    /// Defaults for a node: export off, tracer named `sensorsphere.<node>`.
    #[must_use]
    pub fn for_node(node_name: &str) -> Self {
        Self {
            enabled: false,
            otlp_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            service_name: format!("sensorsphere.{node_name}"),
            development: false,
        }
    }
}

/// Telemetry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TelemetryError {
    /// The OTLP exporter could not be built.
    #[error("failed to create OTLP exporter: {0}")]
    Exporter(String),

    /// Flushing or shutting down the tracer provider failed.
    #[error("failed to shut down tracer provider: {0}")]
    Shutdown(String),
}

/// Handle to the running tracer provider.
#[derive(Debug, Default)]
pub struct Telemetry {
    tracer_provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    /// Telemetry with no exporter.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            tracer_provider: None,
        }
    }

    /// True when spans are being exported.
    #[must_use]
    pub const fn is_exporting(&self) -> bool {
        self.tracer_provider.is_some()
    }

    /// Flush pending spans and stop the exporter.
    pub async fn shutdown(&self) -> Result<(), TelemetryError> {
        let Some(provider) = self.tracer_provider.clone() else {
            return Ok(());
        };

        tokio::task::spawn_blocking(move || provider.shutdown())
            .await
            .map_err(|e| TelemetryError::Shutdown(e.to_string()))?
            .map_err(|e| TelemetryError::Shutdown(e.to_string()))
    }
}

/// Install the subscriber and build the tracer provider.
pub fn init(config: &TelemetryConfig) -> Result<Telemetry, TelemetryError> {
    let env_filter = DIRECTIVES
        .iter()
        .filter_map(|d| d.parse::<Directive>().ok())
        .fold(EnvFilter::from_default_env(), EnvFilter::add_directive);

    let pretty = config.development.then(|| {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
    });
    let compact = (!config.development).then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_thread_ids(false)
    });

    let tracer_provider = if config.enabled {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&config.otlp_endpoint)
            .build()
            .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

        Some(
            SdkTracerProvider::builder()
                .with_batch_exporter(exporter)
                .with_resource(
                    opentelemetry_sdk::Resource::builder()
                        .with_service_name(config.service_name.clone())
                        .build(),
                )
                .build(),
        )
    } else {
        None
    };

    let otel_layer = tracer_provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(config.service_name.clone()))
    });

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty)
        .with(compact)
        .with(otel_layer)
        .try_init();

    if let Err(e) = installed {
        tracing::debug!(error = %e, "tracing subscriber already installed, keeping it");
    }

    tracing::info!(
        service_name = %config.service_name,
        exporting = tracer_provider.is_some(),
        "telemetry initialized"
    );

    Ok(Telemetry { tracer_provider })
}

// =============================================================================
// Tests
// =============================================================================
