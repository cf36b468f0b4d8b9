//! Tracer setup and management

use crate::{
    carrier::{HeaderExtractor, HeaderInjector},
    config::{TelemetryConfig, TracingExporter},
    error::{TelemetryError, TelemetryResult},
};
use http::HeaderMap;
use opentelemetry::{
    Context,
    propagation::TextMapPropagator,
    trace::TracerProvider as _,
};
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{RandomIdGenerator, Sampler, SdkTracer, SdkTracerProvider},
};

/// Instrumentation scope name for outbound client spans.
const TRACER_NAME: &str = "api-gateway";

/// Handle to the tracer used for outbound client spans.
///
/// Cloning is cheap; every clone shares the same provider.
#[derive(Clone)]
pub struct Telemetry {
    provider: SdkTracerProvider,
    tracer: SdkTracer,
    propagator: TraceContextPropagator,
}

impl Telemetry {
    /// Initialize tracing based on configuration.
    pub fn init(config: &TelemetryConfig) -> TelemetryResult<Self> {
        config.validate()?;

        if !config.enable_tracing {
            return Ok(Self::disabled());
        }

        let sampler = if config.sampling_ratio >= 1.0 {
            Sampler::AlwaysOn
        } else if config.sampling_ratio <= 0.0 {
            Sampler::ParentBased(Box::new(Sampler::AlwaysOff))
        } else {
            Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                config.sampling_ratio,
            )))
        };

        let builder = SdkTracerProvider::builder()
            .with_resource(config.create_resource())
            .with_id_generator(RandomIdGenerator::default())
            .with_sampler(sampler);

        let provider = match config.exporter {
            #[cfg(feature = "otlp")]
            TracingExporter::Otlp => {
                use opentelemetry_otlp::WithExportConfig;

                let endpoint = config.otlp_endpoint.as_ref().ok_or_else(|| {
                    TelemetryError::Config("OTLP endpoint not configured".to_string())
                })?;

                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_tonic()
                    .with_endpoint(endpoint)
                    .build()
                    .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

                builder.with_batch_exporter(exporter).build()
            }

            TracingExporter::None => builder.build(),

            #[allow(unreachable_patterns)]
            _ => {
                return Err(TelemetryError::Config(format!(
                    "Tracing exporter {:?} not available (feature not enabled)",
                    config.exporter
                )));
            }
        };

        tracing::info!(
            service = %config.service_name,
            exporter = ?config.exporter,
            sampling_ratio = config.sampling_ratio,
            "Tracer provider initialized"
        );

        Ok(Self::from_provider(provider))
    }

    /// Telemetry that never starts a sampled trace of its own.
    ///
    /// Client spans are still created and their context is still injected
    /// into outbound headers, so downstream services keep a valid parent.
    /// A sampled inbound parent keeps its sampled flag, so traces started
    /// upstream are not cut at the gateway.
    pub fn disabled() -> Self {
        Self::from_provider(
            SdkTracerProvider::builder()
                .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOff)))
                .build(),
        )
    }

    /// Adopt an externally built provider (e.g. one with an in-memory exporter).
    pub fn from_provider(provider: SdkTracerProvider) -> Self {
        let tracer = provider.tracer(TRACER_NAME);
        Self {
            provider,
            tracer,
            propagator: TraceContextPropagator::new(),
        }
    }

    /// The tracer used to start client spans.
    pub fn tracer(&self) -> &SdkTracer {
        &self.tracer
    }

    /// Serialize the span held by `cx` into outbound headers.
    pub fn inject(&self, cx: &Context, headers: &mut HeaderMap) {
        self.propagator
            .inject_context(cx, &mut HeaderInjector(headers));
    }

    /// Rebuild the caller's context from inbound headers.
    ///
    /// Returns an empty context (no active span) when no trace headers are present.
    pub fn extract(&self, headers: &HeaderMap) -> Context {
        self.propagator.extract(&HeaderExtractor(headers))
    }

    /// Flush pending spans and stop the provider.
    pub fn shutdown(&self) -> TelemetryResult<()> {
        self.provider
            .shutdown()
            .map_err(|e| TelemetryError::Shutdown(e.to_string()))
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("tracer", &TRACER_NAME)
            .finish_non_exhaustive()
    }
}
