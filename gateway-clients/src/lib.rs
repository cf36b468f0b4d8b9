//! Typed downstream clients for the API gateway.
//!
//! Each [`TypedClient`] binds a [`ServiceDescriptor`] to the shared
//! transport and the service's circuit breaker, and exposes one
//! `invoke(parent)` operation that always returns a value: the decoded
//! reply, or the descriptor's fallback.
//!
//! # Examples
//!
//! ```rust,no_run
//! use gateway_clients::{ClientRegistry, GatewayConfig};
//! use gateway_telemetry::Telemetry;
//! use opentelemetry::Context;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::load(None)?;
//!     let telemetry = Telemetry::init(&config.telemetry)?;
//!     let registry = ClientRegistry::install_global(ClientRegistry::from_config(&config, telemetry)?);
//!
//!     for client in registry.list_clients() {
//!         println!("{}: {}", client.name(), client.invoke(&Context::current()).await);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod descriptor;
pub mod env;
pub mod error;
pub mod registry;
pub mod resolver;

pub use client::{ServiceClient, TypedClient};
pub use config::{BreakerSettings, GatewayConfig, HttpSettings};
pub use descriptor::ServiceDescriptor;
pub use env::EnvSnapshot;
pub use error::{ConfigError, ResolveError, Result};
pub use registry::{ClientRegistry, GREETING_SERVICES};
pub use resolver::{DEFAULT_PORT, EndpointSource, ResolvedEndpoint, resolve_endpoint};
