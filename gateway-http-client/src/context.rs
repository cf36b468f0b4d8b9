//! Per-call context threaded through the interceptor chain.

use gateway_telemetry::ClientSpan;
use http::Method;
use opentelemetry::Context;
use std::time::{Duration, Instant};

/// Absolute deadline carried by the caller's [`Context`].
///
/// ```
/// use gateway_http_client::Deadline;
/// use opentelemetry::Context;
/// use std::time::Duration;
///
/// let parent = Context::new().with_value(Deadline::after(Duration::from_millis(250)));
/// assert!(Deadline::remaining(&parent).unwrap() <= Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(pub Instant);

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }

    /// Time left before the deadline stored in `cx`, if any.
    pub fn remaining(cx: &Context) -> Option<Duration> {
        cx.get::<Deadline>()
            .map(|deadline| deadline.0.saturating_duration_since(Instant::now()))
    }
}

/// State of one outbound call.
///
/// Created by the typed client per invocation and dropped when the call
/// returns. The child span lives here between the request and response
/// interceptors.
#[derive(Debug)]
pub struct CallContext {
    service: String,
    parent: Context,
    method: Method,
    url: Option<String>,
    span: Option<ClientSpan>,
    started: Instant,
}

impl CallContext {
    /// Create the context for one call to `service` on behalf of `parent`.
    pub fn new(service: impl Into<String>, parent: &Context) -> Self {
        Self {
            service: service.into(),
            parent: parent.clone(),
            method: Method::GET,
            url: None,
            span: None,
            started: Instant::now(),
        }
    }

    /// Downstream service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Caller's context (parent span and optional deadline).
    pub fn parent(&self) -> &Context {
        &self.parent
    }

    /// HTTP method of the call.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL, once resolved.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub(crate) fn set_target(&mut self, method: Method, url: impl Into<String>) {
        self.method = method;
        self.url = Some(url.into());
    }

    /// Attach the child span for the response path to finish.
    pub fn attach_span(&mut self, span: ClientSpan) {
        self.span = Some(span);
    }

    /// Child span, if the request path started one.
    pub fn span(&self) -> Option<&ClientSpan> {
        self.span.as_ref()
    }

    /// Take the child span out to finish it.
    pub fn take_span(&mut self) -> Option<ClientSpan> {
        self.span.take()
    }

    /// Time since the call started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Effective per-call timeout: `min(remaining parent deadline, call_timeout)`.
    pub fn effective_timeout(&self, call_timeout: Duration) -> Duration {
        match Deadline::remaining(&self.parent) {
            Some(remaining) => remaining.min(call_timeout),
            None => call_timeout,
        }
    }
}
