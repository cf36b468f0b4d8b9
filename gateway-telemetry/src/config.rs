//! Configuration for gateway telemetry

use crate::error::{TelemetryError, TelemetryResult};
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use serde::{Deserialize, Serialize};

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name reported on every span
    pub service_name: String,

    /// Service version
    pub service_version: Option<String>,

    /// Environment (e.g., "production", "staging", "development")
    pub environment: Option<String>,

    /// Enable tracing. When disabled, client spans are non-recording but
    /// trace context is still propagated.
    pub enable_tracing: bool,

    /// Sampling ratio (0.0 to 1.0)
    pub sampling_ratio: f64,

    /// Exporter type
    pub exporter: TracingExporter,

    /// OTLP endpoint (if using OTLP)
    pub otlp_endpoint: Option<String>,
}

/// Tracing exporter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingExporter {
    /// OTLP exporter (OpenTelemetry Protocol)
    Otlp,
    /// No exporter. Spans are recorded but go nowhere.
    None,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "api-gateway".to_string(),
            service_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            environment: None,
            enable_tracing: true,
            sampling_ratio: 1.0,
            exporter: TracingExporter::None,
            otlp_endpoint: None,
        }
    }
}

impl TelemetryConfig {
    /// Create a new configuration with a service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set service version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    /// Set environment
    pub fn with_environment(mut self, env: impl Into<String>) -> Self {
        self.environment = Some(env.into());
        self
    }

    /// Enable or disable tracing
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Set the sampling ratio
    pub fn with_sampling_ratio(mut self, ratio: f64) -> Self {
        self.sampling_ratio = ratio;
        self
    }

    /// Export spans over OTLP to the given collector endpoint
    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.exporter = TracingExporter::Otlp;
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    /// Create OpenTelemetry resource from configuration
    pub fn create_resource(&self) -> Resource {
        let mut attributes = vec![KeyValue::new("service.name", self.service_name.clone())];

        if let Some(ref version) = self.service_version {
            attributes.push(KeyValue::new("service.version", version.clone()));
        }

        if let Some(ref env) = self.environment {
            attributes.push(KeyValue::new("deployment.environment", env.clone()));
        }

        Resource::builder().with_attributes(attributes).build()
    }

    /// Validate configuration
    pub fn validate(&self) -> TelemetryResult<()> {
        if self.service_name.is_empty() {
            return Err(TelemetryError::Config(
                "Service name cannot be empty".to_string(),
            ));
        }

        if self.enable_tracing
            && self.exporter == TracingExporter::Otlp
            && self.otlp_endpoint.is_none()
        {
            return Err(TelemetryError::Config(
                "OTLP endpoint required for OTLP tracing exporter".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.sampling_ratio) {
            return Err(TelemetryError::Config(
                "Sampling ratio must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }
}
