//! Shared HTTP transport.

use std::sync::Arc;
use std::time::Duration;

use gateway_telemetry::Telemetry;

use crate::{
    CallContext, HttpClientConfig, HttpClientError, Interceptor, LoggingInterceptor, RemoteCall,
    Response, Result, TracingInterceptor, request::parse_url,
};

/// HTTP transport shared by every typed client.
///
/// Wraps one pooled `reqwest::Client` and the interceptor chain. Cloning is
/// cheap and clones share the connection pool.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: Arc<HttpClientConfig>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl HttpClient {
    /// Create a new HTTP client with no interceptors.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| HttpClientError::Build(e.to_string()))?;

        Ok(Self {
            inner,
            config: Arc::new(config),
            interceptors: Vec::new(),
        })
    }

    /// Create a client with the tracing and logging interceptors installed.
    pub fn traced(config: HttpClientConfig, telemetry: Telemetry) -> Result<Self> {
        Ok(Self::new(config)?
            .with_interceptor(TracingInterceptor::new(telemetry))
            .with_interceptor(LoggingInterceptor::new()))
    }

    /// Append an interceptor to the chain.
    pub fn with_interceptor<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Get the client configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Execute `call` against `base_url` through the interceptor chain.
    ///
    /// Status 5xx (and 4xx when so configured) and undecodable bodies are
    /// returned as errors after the response interceptors have seen them.
    pub async fn execute<T>(
        &self,
        ctx: &mut CallContext,
        base_url: &str,
        call: &RemoteCall<T>,
    ) -> Result<T> {
        let url = call.url(base_url);
        ctx.set_target(call.method().clone(), url.as_str());

        let parsed = match parse_url(&url) {
            Ok(parsed) => parsed,
            Err(error) => {
                self.reject(ctx, &error).await;
                return Err(error);
            }
        };

        let mut request = reqwest::Request::new(call.method().clone(), parsed);
        for interceptor in &self.interceptors {
            if let Err(error) = interceptor.intercept_request(ctx, &mut request).await {
                self.complete(ctx, Err(&error)).await;
                return Err(error);
            }
        }

        let timeout = ctx.effective_timeout(self.config.call_timeout);
        let outcome = match self.send(request, timeout).await.and_then(|r| self.classify(r)) {
            Ok(response) => call.decode(&response).map(|value| (response, value)),
            Err(error) => Err(error),
        };

        self.complete(ctx, outcome.as_ref().map(|(response, _)| response))
            .await;
        outcome.map(|(_, value)| value)
    }

    /// Run the rejection path for a call that will not be sent.
    pub async fn reject(&self, ctx: &mut CallContext, error: &HttpClientError) {
        for interceptor in &self.interceptors {
            interceptor.intercept_rejection(ctx, error).await;
        }
    }

    async fn complete(&self, ctx: &mut CallContext, outcome: crate::ResponseOutcome<'_>) {
        for interceptor in &self.interceptors {
            interceptor.intercept_response(ctx, outcome).await;
        }
    }

    /// Send and read the body within `timeout`; the in-flight call is
    /// dropped when the deadline elapses.
    async fn send(&self, request: reqwest::Request, timeout: Duration) -> Result<Response> {
        let exchange = async {
            let response = self
                .inner
                .execute(request)
                .await
                .map_err(|e| HttpClientError::from_reqwest(e, timeout))?;
            Response::from_reqwest(response, timeout).await
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(HttpClientError::Timeout(timeout)),
        }
    }

    fn classify(&self, response: Response) -> Result<Response> {
        let status = response.status().as_u16();
        if response.is_server_error() {
            Err(HttpClientError::RemoteFailure { status })
        } else if response.is_client_error() && self.config.client_errors_are_failures {
            Err(HttpClientError::ClientStatus { status })
        } else {
            Ok(response)
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::Context;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(config: HttpClientConfig) -> HttpClient {
        HttpClient::new(config).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = client(HttpClientConfig::default());
        assert_eq!(client.config().call_timeout, Duration::from_secs(1));
        assert!(!client.config().client_errors_are_failures);
    }

    #[tokio::test]
    async fn test_execute_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/aloha"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Aloha World"))
            .mount(&server)
            .await;

        let client = client(HttpClientConfig::default());
        let mut ctx = CallContext::new("aloha", &Context::new());
        let body = client
            .execute(&mut ctx, &server.uri(), &RemoteCall::get_text("/api/aloha"))
            .await
            .unwrap();

        assert_eq!(body, "Aloha World");
        assert_eq!(ctx.url(), Some(format!("{}/api/aloha", server.uri()).as_str()));
    }

    #[tokio::test]
    async fn test_execute_classifies_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client(HttpClientConfig::default());
        let mut ctx = CallContext::new("bonjour", &Context::new());
        let err = client
            .execute(&mut ctx, &server.uri(), &RemoteCall::get_text("api/bonjour"))
            .await
            .unwrap_err();

        assert!(matches!(err, HttpClientError::RemoteFailure { status: 503 }));
    }

    #[tokio::test]
    async fn test_client_errors_follow_policy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let lenient = client(HttpClientConfig::default());
        let mut ctx = CallContext::new("hola", &Context::new());
        let body = lenient
            .execute(&mut ctx, &server.uri(), &RemoteCall::get_text("api/hola"))
            .await
            .unwrap();
        assert_eq!(body, "missing");

        let strict = client(
            HttpClientConfig::builder()
                .client_errors_are_failures(true)
                .build(),
        );
        let mut ctx = CallContext::new("hola", &Context::new());
        let err = strict
            .execute(&mut ctx, &server.uri(), &RemoteCall::get_text("api/hola"))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpClientError::ClientStatus { status: 404 }));
    }

    #[tokio::test]
    async fn test_execute_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = client(
            HttpClientConfig::builder()
                .call_timeout(Duration::from_millis(100))
                .build(),
        );
        let mut ctx = CallContext::new("hola", &Context::new());
        let started = std::time::Instant::now();
        let err = client
            .execute(&mut ctx, &server.uri(), &RemoteCall::get_text("api/hola"))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_transport_error() {
        let client = client(HttpClientConfig::default());
        let mut ctx = CallContext::new("bonjour", &Context::new());
        let err = client
            .execute(&mut ctx, "http://10.0.0.5:null", &RemoteCall::get_text("api/bonjour"))
            .await
            .unwrap_err();

        assert!(matches!(err, HttpClientError::InvalidUrl(_)));
        assert_eq!(err.kind(), crate::ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let client = client(HttpClientConfig::default());
        let mut ctx = CallContext::new("ola", &Context::new());
        let err = client
            .execute(&mut ctx, "http://127.0.0.1:1", &RemoteCall::get_text("api/ola"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::Transport);
    }

    struct DenyAll {
        responses: Arc<parking_lot::Mutex<Vec<bool>>>,
    }

    #[async_trait::async_trait]
    impl Interceptor for DenyAll {
        async fn intercept_request(
            &self,
            ctx: &mut CallContext,
            _request: &mut reqwest::Request,
        ) -> Result<()> {
            Err(HttpClientError::Interceptor(format!("{} is blocked", ctx.service())))
        }

        async fn intercept_response(
            &self,
            _ctx: &mut CallContext,
            outcome: crate::ResponseOutcome<'_>,
        ) {
            self.responses.lock().push(outcome.is_ok());
        }
    }

    #[tokio::test]
    async fn test_interceptor_can_veto_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let responses = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let client = client(HttpClientConfig::default()).with_interceptor(DenyAll {
            responses: Arc::clone(&responses),
        });
        let mut ctx = CallContext::new("aloha", &Context::new());
        let err = client
            .execute(&mut ctx, &server.uri(), &RemoteCall::get_text("api/aloha"))
            .await
            .unwrap_err();

        assert!(matches!(err, HttpClientError::Interceptor(ref m) if m == "aloha is blocked"));
        assert_eq!(err.kind(), crate::ErrorKind::Transport);
        assert_eq!(*responses.lock(), vec![false]);
    }
}
