//! Shared harness for the dispatch scenarios.

#![allow(dead_code)]

use api_gateway::prelude::*;
use opentelemetry::KeyValue;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use std::time::Duration;

pub struct Harness {
    pub registry: ClientRegistry,
    pub telemetry: Telemetry,
    pub exporter: InMemorySpanExporter,
}

/// Gateway config tuned for tests: short cool-down, small sample floor.
pub fn test_config(minimum_samples: usize, open_ms: u64) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.breaker.minimum_samples = minimum_samples;
    config.breaker.open_state_duration_ms = open_ms;
    config.http.call_timeout_ms = 1_000;
    config
}

pub fn harness(config: &GatewayConfig, env: EnvSnapshot) -> Harness {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    let telemetry = Telemetry::from_provider(provider);
    let http = HttpClient::traced(config.http_client(), telemetry.clone()).unwrap();

    Harness {
        registry: ClientRegistry::new(http, env),
        telemetry,
        exporter,
    }
}

impl Harness {
    pub fn client(&self, name: &str) -> &dyn ServiceClient {
        self.registry.client(name).unwrap().as_ref()
    }

    pub fn spans(&self) -> Vec<SpanData> {
        self.exporter.get_finished_spans().unwrap()
    }
}

pub fn attribute(span: &SpanData, key: &str) -> Option<String> {
    find(&span.attributes, key)
}

/// `error.kind` recorded on the span's error event.
pub fn error_kind(span: &SpanData) -> Option<String> {
    span.events
        .events
        .iter()
        .find(|event| event.name == "error")
        .and_then(|event| find(&event.attributes, "error.kind"))
}

fn find(attributes: &[KeyValue], key: &str) -> Option<String> {
    attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.to_string())
}

pub const SHORT_COOL_DOWN: Duration = Duration::from_millis(200);
