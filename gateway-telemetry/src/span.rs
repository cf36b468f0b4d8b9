//! Client spans for outbound calls.
//!
//! A [`ClientSpan`] owns the child span of one outbound call. It is finished
//! explicitly by the response path, and finished on drop if any exit path
//! skipped that step.

use opentelemetry::{
    Context, KeyValue,
    trace::{SpanKind, Status, TraceContextExt, Tracer},
};
use opentelemetry_sdk::trace::SdkTracer;

/// Attribute keys written on client spans.
pub mod keys {
    /// Always `client` for outbound calls.
    pub const SPAN_KIND: &str = "span.kind";
    /// HTTP method of the outbound request.
    pub const HTTP_METHOD: &str = "http.method";
    /// Absolute URL of the outbound request.
    pub const HTTP_URL: &str = "http.url";
    /// Status code of the downstream response.
    pub const HTTP_STATUS_CODE: &str = "http.status_code";
    /// Name of the downstream service.
    pub const PEER_SERVICE: &str = "peer.service";
    /// `true` when the call failed for any reason.
    pub const ERROR: &str = "error";
    /// `open` when the call was short-circuited by the circuit breaker.
    pub const BREAKER: &str = "breaker";
    /// Error kind on the `error` event.
    pub const ERROR_KIND: &str = "error.kind";
    /// Human-readable message on the `error` event.
    pub const MESSAGE: &str = "message";
}

/// Scoped handle to one outbound call's child span.
#[derive(Debug)]
pub struct ClientSpan {
    cx: Context,
    finished: bool,
}

impl ClientSpan {
    /// Start a client span for `service` as a child of `parent`.
    ///
    /// When `parent` carries no active span a root span is started instead.
    pub fn start(
        tracer: &SdkTracer,
        parent: &Context,
        service: &str,
        attributes: Vec<KeyValue>,
    ) -> Self {
        let mut all = Vec::with_capacity(attributes.len() + 2);
        all.push(KeyValue::new(keys::SPAN_KIND, "client"));
        all.push(KeyValue::new(keys::PEER_SERVICE, service.to_string()));
        all.extend(attributes);

        let span = tracer
            .span_builder(service.to_string())
            .with_kind(SpanKind::Client)
            .with_attributes(all)
            .start_with_context(tracer, parent);

        Self {
            cx: parent.with_span(span),
            finished: false,
        }
    }

    /// Context holding the child span; inject this into outbound headers.
    pub fn context(&self) -> &Context {
        &self.cx
    }

    /// Attach an attribute to the span.
    pub fn tag(&self, attribute: KeyValue) {
        self.cx.span().set_attribute(attribute);
    }

    /// Record the downstream status code.
    pub fn record_status(&self, status: u16) {
        self.tag(KeyValue::new(keys::HTTP_STATUS_CODE, i64::from(status)));
    }

    /// Mark the call as failed: `error=true`, span status Error, and an
    /// `error` event carrying the kind and message.
    pub fn record_error(&self, kind: &str, message: &str) {
        let span = self.cx.span();
        span.set_attribute(KeyValue::new(keys::ERROR, true));
        span.set_status(Status::error(message.to_string()));
        span.add_event(
            "error",
            vec![
                KeyValue::new(keys::ERROR_KIND, kind.to_string()),
                KeyValue::new(keys::MESSAGE, message.to_string()),
            ],
        );
    }

    /// End the span. Calling this more than once has no further effect.
    pub fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.cx.span().end();
        }
    }

    /// Whether [`finish`](Self::finish) has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Drop for ClientSpan {
    fn drop(&mut self) {
        self.finish();
    }
}
