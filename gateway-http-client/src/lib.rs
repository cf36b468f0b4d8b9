//! # Gateway HTTP Client
//!
//! Outbound HTTP for the API gateway: one pooled transport, a per-service
//! circuit breaker, per-call timeouts and trace context propagation.
//!
//! ## Features
//!
//! - **Circuit Breaker**: Sliding-window failure ratio with half-open probes
//! - **Timeouts**: Per-call deadline, tightened by the caller's [`Deadline`]
//! - **Interceptors**: Client spans and structured request logging
//! - **Fallbacks**: [`BreakerInvoker::invoke`] never fails, it substitutes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gateway_http_client::{
//!     BreakerInvoker, CallContext, CircuitBreaker, CircuitBreakerConfig, HttpClient,
//!     HttpClientConfig, RemoteCall,
//! };
//! use opentelemetry::Context;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::new(HttpClientConfig::default())?;
//!     let breaker = CircuitBreaker::new("aloha", CircuitBreakerConfig::default());
//!     let invoker = BreakerInvoker::new(&client, &breaker);
//!
//!     let mut ctx = CallContext::new("aloha", &Context::current());
//!     let fallback = "Aloha response (fallback)".to_string();
//!     let body = invoker
//!         .invoke(&mut ctx, Ok("http://aloha:8080/"), &RemoteCall::get_text("api/aloha"), &fallback)
//!         .await;
//!
//!     println!("{}", body);
//!     Ok(())
//! }
//! ```

mod circuit_breaker;
mod client;
mod config;
mod context;
mod error;
mod interceptor;
mod invoker;
mod request;
mod response;

pub use circuit_breaker::{
    BreakerPermit, BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState,
};
pub use client::HttpClient;
pub use config::{HttpClientConfig, HttpClientConfigBuilder};
pub use context::{CallContext, Deadline};
pub use error::{ErrorKind, HttpClientError, Result};
pub use interceptor::{Interceptor, LoggingInterceptor, ResponseOutcome, TracingInterceptor};
pub use invoker::BreakerInvoker;
pub use request::{Decoder, RemoteCall, join_url};
pub use response::Response;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        BreakerInvoker, CallContext, CircuitBreaker, CircuitBreakerConfig, CircuitState, Deadline,
        HttpClient, HttpClientConfig, HttpClientError, RemoteCall, Response,
    };
}
