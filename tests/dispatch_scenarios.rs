//! End-to-end dispatch scenarios against stub downstream services.

mod common;

use api_gateway::prelude::*;
use common::{SHORT_COOL_DOWN, attribute, error_kind, harness, test_config};
use opentelemetry::trace::{SpanKind, TraceContextExt};
use std::time::{Duration, Instant};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Successful dispatch
// =============================================================================

#[tokio::test]
async fn test_default_call_returns_reply_with_client_span() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/aloha"))
        .and(header_exists("traceparent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Aloha World"))
        .expect(1)
        .mount(&server)
        .await;

    let env = EnvSnapshot::from_pairs([("ALOHA_SERVER_URL", format!("{}/", server.uri()))]);
    let h = harness(&test_config(10, 5_000), env);

    let aloha = &h.registry.list_clients()[0];
    assert_eq!(aloha.name(), "aloha");
    assert_eq!(aloha.invoke(&OtelContext::new()).await, "Aloha World");

    let spans = h.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].span_kind, SpanKind::Client);
    assert_eq!(attribute(&spans[0], "span.kind").as_deref(), Some("client"));
    assert_eq!(attribute(&spans[0], "peer.service").as_deref(), Some("aloha"));
    assert_eq!(attribute(&spans[0], "http.method").as_deref(), Some("GET"));
    assert_eq!(
        attribute(&spans[0], "http.url"),
        Some(format!("{}/api/aloha", server.uri()))
    );
    assert_eq!(attribute(&spans[0], "http.status_code").as_deref(), Some("200"));
    assert_eq!(attribute(&spans[0], "error"), None);
}

// =============================================================================
// Failures substitute the fallback
// =============================================================================

#[tokio::test]
async fn test_server_error_returns_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bonjour"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let address = server.address();
    let env = EnvSnapshot::from_pairs([
        ("BONJOUR_SERVICE_HOST", address.ip().to_string()),
        ("BONJOUR_SERVICE_PORT", address.port().to_string()),
    ]);
    let h = harness(&test_config(10, 5_000), env);
    let bonjour = h.client("bonjour");

    assert_eq!(bonjour.invoke(&OtelContext::new()).await, "Bonjour response (fallback)");
    assert_eq!(bonjour.breaker().snapshot().failures, 1);

    let spans = h.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(attribute(&spans[0], "error").as_deref(), Some("true"));
    assert_eq!(attribute(&spans[0], "http.status_code").as_deref(), Some("500"));
    assert_eq!(error_kind(&spans[0]).as_deref(), Some("remote_failure"));
}

#[tokio::test]
async fn test_slow_downstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/hola"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Hola Mundo")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let env = EnvSnapshot::from_pairs([("HOLA_SERVER_URL", format!("{}/", server.uri()))]);
    let h = harness(&test_config(10, 5_000), env);

    let started = Instant::now();
    let reply = h.client("hola").invoke(&OtelContext::new()).await;
    let elapsed = started.elapsed();

    assert_eq!(reply, "Hola response (fallback)");
    assert!(elapsed >= Duration::from_millis(900), "returned after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "returned after {:?}", elapsed);

    let spans = h.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(attribute(&spans[0], "error").as_deref(), Some("true"));
    assert_eq!(error_kind(&spans[0]).as_deref(), Some("timeout"));
}

#[tokio::test]
async fn test_parent_deadline_tightens_call_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let env = EnvSnapshot::from_pairs([("HOLA_SERVER_URL", server.uri())]);
    let h = harness(&test_config(10, 5_000), env);
    let parent = OtelContext::new().with_value(Deadline::after(Duration::from_millis(100)));

    let started = Instant::now();
    let reply = h.client("hola").invoke(&parent).await;

    assert_eq!(reply, "Hola response (fallback)");
    assert!(started.elapsed() < Duration::from_millis(800));
}

#[tokio::test]
async fn test_unreachable_downstream_returns_fallback() {
    let env = EnvSnapshot::from_pairs([("OLA_SERVER_URL", "http://127.0.0.1:1/")]);
    let h = harness(&test_config(10, 5_000), env);

    assert_eq!(h.client("ola").invoke(&OtelContext::new()).await, "Ola response (fallback)");

    let spans = h.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(error_kind(&spans[0]).as_deref(), Some("transport"));
}

// =============================================================================
// Circuit breaker
// =============================================================================

#[tokio::test]
async fn test_breaker_trips_then_recovers_through_probe() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ola"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&server)
        .await;

    let env = EnvSnapshot::from_pairs([("OLA_SERVER_URL", server.uri())]);
    let h = harness(&test_config(5, SHORT_COOL_DOWN.as_millis() as u64), env);
    let ola = h.client("ola");

    for _ in 0..5 {
        assert_eq!(ola.invoke(&OtelContext::new()).await, "Ola response (fallback)");
    }
    assert_eq!(ola.breaker().state(), CircuitState::Open);

    // Short-circuited: no request reaches the stub.
    let started = Instant::now();
    assert_eq!(ola.invoke(&OtelContext::new()).await, "Ola response (fallback)");
    assert!(started.elapsed() < Duration::from_millis(50));
    assert_eq!(ola.breaker().snapshot().short_circuited, 1);

    let spans = h.spans();
    assert_eq!(spans.len(), 6);
    let rejected = &spans[5];
    assert_eq!(attribute(rejected, "breaker").as_deref(), Some("open"));
    assert_eq!(attribute(rejected, "error").as_deref(), Some("true"));
    assert_eq!(attribute(rejected, "peer.service").as_deref(), Some("ola"));
    assert_eq!(error_kind(rejected).as_deref(), Some("breaker_open"));

    server.verify().await;
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/ola"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Ola!"))
        .expect(1)
        .mount(&server)
        .await;

    tokio::time::sleep(SHORT_COOL_DOWN + Duration::from_millis(50)).await;
    assert_eq!(ola.breaker().state(), CircuitState::HalfOpen);

    assert_eq!(ola.invoke(&OtelContext::new()).await, "Ola!");
    assert_eq!(ola.breaker().state(), CircuitState::Closed);
    assert_eq!(ola.breaker().snapshot().failures, 0);
}

#[tokio::test]
async fn test_failed_probe_reopens_breaker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let env = EnvSnapshot::from_pairs([("HOLA_SERVER_URL", server.uri())]);
    let h = harness(&test_config(5, SHORT_COOL_DOWN.as_millis() as u64), env);
    let hola = h.client("hola");

    for _ in 0..5 {
        hola.invoke(&OtelContext::new()).await;
    }
    tokio::time::sleep(SHORT_COOL_DOWN + Duration::from_millis(50)).await;

    assert_eq!(hola.invoke(&OtelContext::new()).await, "Hola response (fallback)");
    assert_eq!(hola.breaker().state(), CircuitState::Open);
    assert_eq!(server.received_requests().await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_cancelled_probe_does_not_wedge_breaker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ola"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let env = EnvSnapshot::from_pairs([("OLA_SERVER_URL", server.uri())]);
    let h = harness(&test_config(5, SHORT_COOL_DOWN.as_millis() as u64), env);
    let ola = h.client("ola");

    for _ in 0..5 {
        ola.invoke(&OtelContext::new()).await;
    }
    assert_eq!(ola.breaker().state(), CircuitState::Open);

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/ola"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Ola!")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    tokio::time::sleep(SHORT_COOL_DOWN + Duration::from_millis(50)).await;

    // The caller gives up on the probe before the downstream answers.
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        ola.invoke(&OtelContext::new()),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(ola.breaker().state(), CircuitState::Open);

    tokio::time::sleep(SHORT_COOL_DOWN + Duration::from_millis(50)).await;
    assert_eq!(ola.invoke(&OtelContext::new()).await, "Ola!");
    assert_eq!(ola.breaker().state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_concurrent_invokes_on_one_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/aloha"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Aloha World")
                .set_delay(Duration::from_millis(50)),
        )
        .expect(16)
        .mount(&server)
        .await;

    let env = EnvSnapshot::from_pairs([("ALOHA_SERVER_URL", server.uri())]);
    let h = harness(&test_config(10, 5_000), env);
    let aloha = h.client("aloha");

    let parent = OtelContext::new();
    let replies = futures::future::join_all((0..16).map(|_| aloha.invoke(&parent))).await;

    assert!(replies.iter().all(|reply| reply == "Aloha World"));
    let snapshot = aloha.breaker().snapshot();
    assert_eq!(snapshot.successes, 16);
    assert_eq!(snapshot.failures, 0);

    let spans = h.spans();
    assert_eq!(spans.len(), 16);
    let mut span_ids: Vec<_> = spans.iter().map(|s| s.span_context.span_id()).collect();
    span_ids.sort_by_key(|id| id.to_string());
    span_ids.dedup();
    assert_eq!(span_ids.len(), 16);
}

// =============================================================================
// Trace propagation
// =============================================================================

#[tokio::test]
async fn test_child_span_continues_inbound_trace() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hola Mundo"))
        .mount(&server)
        .await;

    let env = EnvSnapshot::from_pairs([("HOLA_SERVER_URL", server.uri())]);
    let h = harness(&test_config(10, 5_000), env);

    let mut inbound = http::HeaderMap::new();
    inbound.insert(
        "traceparent",
        "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".parse().unwrap(),
    );
    let parent = h.telemetry.extract(&inbound);
    assert!(parent.has_active_span());

    assert_eq!(h.client("hola").invoke(&parent).await, "Hola Mundo");

    let spans = h.spans();
    assert_eq!(spans.len(), 1);
    let child = &spans[0];
    assert_eq!(
        child.span_context.trace_id().to_string(),
        "0af7651916cd43dd8448eb211c80319c"
    );
    assert_eq!(child.parent_span_id.to_string(), "b7ad6b7169203331");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let traceparent = requests[0]
        .headers
        .get("traceparent")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert_eq!(
        traceparent,
        format!(
            "00-{}-{}-01",
            child.span_context.trace_id(),
            child.span_context.span_id()
        )
    );
}

#[tokio::test]
async fn test_absent_parent_creates_root_span() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Aloha World"))
        .mount(&server)
        .await;

    let env = EnvSnapshot::from_pairs([("ALOHA_SERVER_URL", server.uri())]);
    let h = harness(&test_config(10, 5_000), env);

    assert_eq!(h.client("aloha").invoke(&OtelContext::new()).await, "Aloha World");

    let spans = h.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(
        spans[0].parent_span_id,
        opentelemetry::trace::SpanId::INVALID
    );
}

#[tokio::test]
async fn test_disabled_telemetry_still_dispatches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header_exists("traceparent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Ola!"))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(10, 5_000);
    let http = HttpClient::traced(config.http_client(), Telemetry::disabled()).unwrap();
    let registry = ClientRegistry::new(
        http,
        EnvSnapshot::from_pairs([("OLA_SERVER_URL", server.uri())]),
    );

    assert_eq!(registry.client("ola").unwrap().invoke(&OtelContext::new()).await, "Ola!");
}

// =============================================================================
// Registry
// =============================================================================

#[tokio::test]
async fn test_registry_fan_out_in_order() {
    let server = MockServer::start().await;
    for (name, reply) in [("aloha", "Aloha"), ("bonjour", "Bonjour"), ("hola", "Hola"), ("ola", "Ola")] {
        Mock::given(method("GET"))
            .and(path(format!("/api/{}", name)))
            .respond_with(ResponseTemplate::new(200).set_body_string(reply))
            .mount(&server)
            .await;
    }

    let env = EnvSnapshot::from_pairs(
        ["ALOHA", "BONJOUR", "HOLA", "OLA"].map(|u| (format!("{}_SERVER_URL", u), server.uri())),
    );
    let h = harness(&test_config(10, 5_000), env);

    let first = h.registry.list_clients();
    assert!(std::ptr::eq(first, h.registry.list_clients()));

    let replies = h.registry.invoke_all(&OtelContext::new()).await;
    assert_eq!(replies, ["Aloha", "Bonjour", "Hola", "Ola"]);
    assert_eq!(h.spans().len(), 4);
}
