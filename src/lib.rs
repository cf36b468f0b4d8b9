// API Gateway - resilient dispatch to downstream services
//
// Typed per-service clients that resolve their endpoint from the
// environment, propagate the caller's trace context and isolate each
// downstream behind a circuit breaker with a fallback value.

// Re-export the member crates
pub use gateway_clients as clients;
pub use gateway_http_client as http_client;
pub use gateway_telemetry as telemetry;

pub use gateway_clients::{
    ClientRegistry, ConfigError, EnvSnapshot, GatewayConfig, ResolvedEndpoint, ServiceClient,
    ServiceDescriptor, TypedClient, resolve_endpoint,
};
pub use gateway_http_client::{
    BreakerPermit, BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState, Deadline,
    HttpClient,
    HttpClientConfig, HttpClientError, RemoteCall,
};
pub use gateway_telemetry::{LogConfig, Telemetry, TelemetryConfig, init_logging};

/// Prelude module for convenient imports
pub mod prelude {
    pub use gateway_clients::{
        ClientRegistry, EnvSnapshot, GatewayConfig, ServiceClient, ServiceDescriptor, TypedClient,
    };
    pub use gateway_http_client::prelude::*;
    pub use gateway_telemetry::{OtelContext, Telemetry, TelemetryConfig, init_logging};
}
