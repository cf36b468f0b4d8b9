//! Client registry.

use crate::{EnvSnapshot, GatewayConfig, Result, ServiceClient, ServiceDescriptor, TypedClient};
use futures::future::join_all;
use gateway_http_client::HttpClient;
use gateway_telemetry::Telemetry;
use once_cell::sync::OnceCell;
use opentelemetry::Context;
use std::sync::Arc;
use tracing::info;

/// Greeting services published by the gateway, in dispatch order.
pub const GREETING_SERVICES: [&str; 4] = ["aloha", "bonjour", "hola", "ola"];

static GLOBAL_REGISTRY: OnceCell<ClientRegistry> = OnceCell::new();

/// Ordered collection of typed clients, one per downstream service.
///
/// The clients are built on first access and never change afterwards.
pub struct ClientRegistry {
    http: HttpClient,
    env: Arc<EnvSnapshot>,
    descriptors: Vec<ServiceDescriptor<String>>,
    clients: OnceCell<Vec<Arc<dyn ServiceClient>>>,
}

impl ClientRegistry {
    /// Registry of the greeting services over `http`.
    pub fn new(http: HttpClient, env: EnvSnapshot) -> Self {
        let descriptors = GREETING_SERVICES
            .iter()
            .map(|name| ServiceDescriptor::greeting(name))
            .collect();
        Self::with_services(http, env, descriptors)
    }

    /// Registry over an explicit list of services.
    pub fn with_services(
        http: HttpClient,
        env: EnvSnapshot,
        descriptors: Vec<ServiceDescriptor<String>>,
    ) -> Self {
        Self {
            http,
            env: Arc::new(env),
            descriptors,
            clients: OnceCell::new(),
        }
    }

    /// Build the greeting registry from validated configuration, with the
    /// tracing and logging interceptors installed and the process
    /// environment captured.
    pub fn from_config(config: &GatewayConfig, telemetry: Telemetry) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::traced(config.http_client(), telemetry)?;
        Ok(Self::new(http, EnvSnapshot::capture()))
    }

    /// Clients in registry order; every call returns the same slice.
    pub fn list_clients(&self) -> &[Arc<dyn ServiceClient>] {
        self.clients.get_or_init(|| {
            let clients: Vec<Arc<dyn ServiceClient>> = self
                .descriptors
                .iter()
                .map(|descriptor| {
                    Arc::new(TypedClient::new(
                        descriptor.clone(),
                        self.http.clone(),
                        Arc::clone(&self.env),
                    )) as Arc<dyn ServiceClient>
                })
                .collect();
            info!(services = clients.len(), "Client registry built");
            clients
        })
    }

    /// Client for service `name`.
    pub fn client(&self, name: &str) -> Option<&Arc<dyn ServiceClient>> {
        self.list_clients().iter().find(|client| client.name() == name)
    }

    /// Invoke every client concurrently; replies come back in registry order.
    pub async fn invoke_all(&self, parent: &Context) -> Vec<String> {
        join_all(self.list_clients().iter().map(|client| client.invoke(parent))).await
    }

    /// Publish `registry` as the process-wide registry.
    ///
    /// The first installation wins; later calls return the registry
    /// already installed.
    pub fn install_global(registry: ClientRegistry) -> &'static ClientRegistry {
        GLOBAL_REGISTRY.get_or_init(|| registry)
    }

    /// Process-wide registry, if one was installed.
    pub fn global() -> Option<&'static ClientRegistry> {
        GLOBAL_REGISTRY.get()
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.descriptors.iter().map(|d| d.name()).collect();
        f.debug_struct("ClientRegistry")
            .field("services", &names)
            .field("built", &self.clients.get().is_some())
            .finish()
    }
}
