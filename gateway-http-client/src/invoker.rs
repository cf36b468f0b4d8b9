//! Breaker-guarded invocation with fallback.

use crate::{CallContext, CircuitBreaker, HttpClient, HttpClientError, RemoteCall, Result};
use tracing::{debug, warn};

/// Runs one call through a service's circuit breaker.
///
/// Every call produces exactly one client span: executed calls through the
/// request and response interceptors, short-circuited calls and calls with
/// an unusable endpoint through the rejection path.
#[derive(Debug, Clone, Copy)]
pub struct BreakerInvoker<'a> {
    client: &'a HttpClient,
    breaker: &'a CircuitBreaker,
}

impl<'a> BreakerInvoker<'a> {
    /// Create an invoker for one service.
    pub fn new(client: &'a HttpClient, breaker: &'a CircuitBreaker) -> Self {
        Self { client, breaker }
    }

    /// Invoke `call` and report the outcome to the breaker.
    ///
    /// `base_url` is the service's resolved endpoint, or the error that
    /// resolving it produced. Short-circuited calls are not recorded as
    /// breaker outcomes. If the returned future is dropped mid-call, the
    /// breaker permit is released unrecorded (a half-open probe reopens the
    /// circuit).
    pub async fn try_invoke<T>(
        &self,
        ctx: &mut CallContext,
        base_url: std::result::Result<&str, &HttpClientError>,
        call: &RemoteCall<T>,
    ) -> Result<T> {
        let Some(permit) = self.breaker.try_acquire() else {
            let error = HttpClientError::CircuitOpen;
            self.client.reject(ctx, &error).await;
            return Err(error);
        };

        let result = match base_url {
            Ok(base_url) => self.client.execute(ctx, base_url, call).await,
            Err(error) => {
                self.client.reject(ctx, error).await;
                Err(error.clone())
            }
        };

        match &result {
            Ok(_) => permit.success(),
            Err(error) => {
                debug!(service = %ctx.service(), kind = %error.kind(), "Recording breaker failure");
                permit.failure();
            }
        }
        result
    }

    /// Invoke `call`, substituting `fallback` on any failure.
    pub async fn invoke<T: Clone>(
        &self,
        ctx: &mut CallContext,
        base_url: std::result::Result<&str, &HttpClientError>,
        call: &RemoteCall<T>,
        fallback: &T,
    ) -> T {
        match self.try_invoke(ctx, base_url, call).await {
            Ok(value) => value,
            Err(error) => {
                warn!(
                    service = %ctx.service(),
                    kind = %error.kind(),
                    error = %error,
                    "Returning fallback"
                );
                fallback.clone()
            }
        }
    }
}
