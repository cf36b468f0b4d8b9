//! Telemetry for the API gateway's outbound calls.
//!
//! This crate provides:
//! - Tracer construction on the OpenTelemetry SDK ([`Telemetry`])
//! - W3C trace-context carriers over HTTP headers
//! - [`ClientSpan`], a scoped child span for one outbound call
//! - Structured logging bootstrap on `tracing-subscriber`
//!
//! # Examples
//!
//! ```
//! use gateway_telemetry::{ClientSpan, Telemetry, TelemetryConfig};
//! use opentelemetry::Context;
//!
//! let telemetry = Telemetry::init(&TelemetryConfig::new("gateway")).unwrap();
//!
//! // No inbound span: the client span becomes a root span.
//! let mut span = ClientSpan::start(telemetry.tracer(), &Context::new(), "aloha", vec![]);
//!
//! let mut headers = http::HeaderMap::new();
//! telemetry.inject(span.context(), &mut headers);
//! assert!(headers.contains_key("traceparent"));
//!
//! span.record_status(200);
//! span.finish();
//! ```

pub mod carrier;
pub mod config;
pub mod error;
pub mod logging;
pub mod span;
pub mod tracer;

pub use carrier::{HeaderExtractor, HeaderInjector};
pub use config::{TelemetryConfig, TracingExporter};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, init_logging};
pub use span::{ClientSpan, keys};
pub use tracer::Telemetry;

// Re-export commonly used OpenTelemetry types
pub use opentelemetry::{Context as OtelContext, KeyValue};
