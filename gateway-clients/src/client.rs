//! Typed per-service clients.

use crate::{EnvSnapshot, ResolvedEndpoint, ServiceDescriptor, resolve_endpoint};
use async_trait::async_trait;
use gateway_http_client::{BreakerInvoker, CallContext, CircuitBreaker, HttpClient, HttpClientError};
use once_cell::sync::OnceCell;
use opentelemetry::Context;
use std::sync::Arc;

/// Capability shared by every client in the registry.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Downstream service name.
    fn name(&self) -> &str;

    /// Breaker guarding this service.
    fn breaker(&self) -> &CircuitBreaker;

    /// Call the service on behalf of `parent`; never fails.
    async fn invoke(&self, parent: &Context) -> String;
}

/// Client for one downstream service.
///
/// Binds a [`ServiceDescriptor`], the shared transport and the service's
/// breaker. The endpoint is resolved on first use and cached for the
/// client's lifetime.
pub struct TypedClient<T> {
    descriptor: ServiceDescriptor<T>,
    http: HttpClient,
    breaker: Arc<CircuitBreaker>,
    env: Arc<EnvSnapshot>,
    endpoint: OnceCell<Result<ResolvedEndpoint, HttpClientError>>,
}

impl<T> TypedClient<T>
where
    T: Clone + Send + Sync,
{
    /// Create a client with its own breaker, configured from the transport.
    pub fn new(descriptor: ServiceDescriptor<T>, http: HttpClient, env: Arc<EnvSnapshot>) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(
            descriptor.name(),
            http.config().circuit_breaker.clone(),
        ));
        Self::with_breaker(descriptor, http, breaker, env)
    }

    /// Create a client around an existing breaker.
    pub fn with_breaker(
        descriptor: ServiceDescriptor<T>,
        http: HttpClient,
        breaker: Arc<CircuitBreaker>,
        env: Arc<EnvSnapshot>,
    ) -> Self {
        Self {
            descriptor,
            http,
            breaker,
            env,
            endpoint: OnceCell::new(),
        }
    }

    /// Service name.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Service descriptor.
    pub fn descriptor(&self) -> &ServiceDescriptor<T> {
        &self.descriptor
    }

    /// Breaker guarding this service.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Resolved endpoint, or the error resolving it produced.
    pub fn endpoint(&self) -> Result<&ResolvedEndpoint, &HttpClientError> {
        self.endpoint
            .get_or_init(|| {
                resolve_endpoint(self.descriptor.name(), &self.env).map_err(HttpClientError::from)
            })
            .as_ref()
    }

    /// Call the service; every failure yields the descriptor's fallback.
    pub async fn invoke(&self, parent: &Context) -> T {
        let mut ctx = CallContext::new(self.descriptor.name(), parent);
        let base_url = self.endpoint().map(|endpoint| endpoint.base_url.as_str());

        BreakerInvoker::new(&self.http, &self.breaker)
            .invoke(
                &mut ctx,
                base_url,
                self.descriptor.call(),
                self.descriptor.fallback(),
            )
            .await
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for TypedClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedClient")
            .field("descriptor", &self.descriptor)
            .field("breaker", &self.breaker.snapshot())
            .field("endpoint", &self.endpoint.get())
            .finish()
    }
}

#[async_trait]
impl ServiceClient for TypedClient<String> {
    fn name(&self) -> &str {
        TypedClient::name(self)
    }

    fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn invoke(&self, parent: &Context) -> String {
        TypedClient::invoke(self, parent).await
    }
}
