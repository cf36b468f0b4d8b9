//! Request and response interceptors.
//!
//! For each call the chain runs `intercept_request` strictly before the
//! wire send and `intercept_response` exactly once afterwards, on success
//! and failure alike. Calls that never reach the wire (open breaker,
//! unusable URL) run `intercept_rejection` instead.

use crate::{CallContext, HttpClientError, Response, Result};
use async_trait::async_trait;
use gateway_telemetry::{ClientSpan, KeyValue, Telemetry, keys};

/// What the response path observes: the decoded response or the failure.
pub type ResponseOutcome<'a> = std::result::Result<&'a Response, &'a HttpClientError>;

/// Interceptor trait for observing and modifying outbound calls.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Intercept and optionally modify the request before sending.
    async fn intercept_request(
        &self,
        _ctx: &mut CallContext,
        _request: &mut reqwest::Request,
    ) -> Result<()> {
        Ok(())
    }

    /// Observe the outcome after the response (or the failure) is known.
    async fn intercept_response(&self, _ctx: &mut CallContext, _outcome: ResponseOutcome<'_>) {}

    /// Observe a call that was rejected before any request was sent.
    async fn intercept_rejection(&self, _ctx: &mut CallContext, _error: &HttpClientError) {}
}

/// Tracing interceptor: one client span per call, context injected into
/// the outbound headers.
#[derive(Debug, Clone)]
pub struct TracingInterceptor {
    telemetry: Telemetry,
}

impl TracingInterceptor {
    /// Create a tracing interceptor on the given telemetry handle.
    pub fn new(telemetry: Telemetry) -> Self {
        Self { telemetry }
    }

    fn request_attributes(ctx: &CallContext) -> Vec<KeyValue> {
        let mut attributes = vec![KeyValue::new(keys::HTTP_METHOD, ctx.method().to_string())];
        if let Some(url) = ctx.url() {
            attributes.push(KeyValue::new(keys::HTTP_URL, url.to_string()));
        }
        attributes
    }

    fn record_failure(span: &ClientSpan, error: &HttpClientError) {
        if let Some(status) = error.status_code() {
            span.record_status(status);
        }
        span.record_error(error.kind().as_str(), &error.to_string());
    }
}

#[async_trait]
impl Interceptor for TracingInterceptor {
    async fn intercept_request(
        &self,
        ctx: &mut CallContext,
        request: &mut reqwest::Request,
    ) -> Result<()> {
        let span = ClientSpan::start(
            self.telemetry.tracer(),
            ctx.parent(),
            ctx.service(),
            Self::request_attributes(ctx),
        );
        self.telemetry.inject(span.context(), request.headers_mut());
        ctx.attach_span(span);
        Ok(())
    }

    async fn intercept_response(&self, ctx: &mut CallContext, outcome: ResponseOutcome<'_>) {
        let Some(mut span) = ctx.take_span() else {
            return;
        };

        match outcome {
            Ok(response) => span.record_status(response.status().as_u16()),
            Err(error) => Self::record_failure(&span, error),
        }
        span.finish();
    }

    async fn intercept_rejection(&self, ctx: &mut CallContext, error: &HttpClientError) {
        let mut span = match ctx.take_span() {
            Some(span) => span,
            None => ClientSpan::start(
                self.telemetry.tracer(),
                ctx.parent(),
                ctx.service(),
                Self::request_attributes(ctx),
            ),
        };

        if matches!(error, HttpClientError::CircuitOpen) {
            span.tag(KeyValue::new(keys::BREAKER, "open"));
        }
        Self::record_failure(&span, error);
        span.finish();
    }
}

/// Logging interceptor: request line, outcome and elapsed time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

impl LoggingInterceptor {
    /// Create a new logging interceptor.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept_request(
        &self,
        ctx: &mut CallContext,
        request: &mut reqwest::Request,
    ) -> Result<()> {
        tracing::debug!(
            service = %ctx.service(),
            method = %request.method(),
            url = %request.url(),
            "Sending HTTP request"
        );

        Ok(())
    }

    async fn intercept_response(&self, ctx: &mut CallContext, outcome: ResponseOutcome<'_>) {
        let elapsed_ms = ctx.elapsed().as_millis() as u64;
        match outcome {
            Ok(response) => tracing::debug!(
                service = %ctx.service(),
                status = response.status().as_u16(),
                elapsed_ms,
                "Received HTTP response"
            ),
            Err(error) => tracing::warn!(
                service = %ctx.service(),
                url = ctx.url().unwrap_or_default(),
                kind = %error.kind(),
                error = %error,
                elapsed_ms,
                "HTTP call failed"
            ),
        }
    }

    async fn intercept_rejection(&self, ctx: &mut CallContext, error: &HttpClientError) {
        tracing::debug!(
            service = %ctx.service(),
            kind = %error.kind(),
            error = %error,
            "HTTP call rejected before send"
        );
    }
}
