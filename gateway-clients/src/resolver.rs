//! Endpoint resolution from the environment.

use crate::{EnvSnapshot, ResolveError};
use tracing::{debug, warn};

/// Port used when only the service name is known.
pub const DEFAULT_PORT: u16 = 8080;

/// Where a resolved base URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSource {
    /// `{U}_SERVER_URL`, used verbatim.
    ServerUrl,
    /// `{U}_SERVICE_HOST` and `{U}_SERVICE_PORT`.
    HostPort,
    /// `http://{name}:8080/`.
    Default,
}

/// Base URL of one downstream service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub base_url: String,
    pub source: EndpointSource,
}

/// Resolve the base URL of service `name`.
///
/// With `U` the upper-cased name, the first hit wins:
/// 1. `{U}_SERVER_URL`, verbatim
/// 2. `{U}_SERVICE_HOST` with `{U}_SERVICE_PORT`, as `http://host:port`
/// 3. `http://{name}:8080/`
///
/// No DNS lookup happens here.
///
/// ```
/// use gateway_clients::{EnvSnapshot, resolve_endpoint};
///
/// let env = EnvSnapshot::from_pairs([("HOLA_SERVER_URL", "http://x/")]);
/// assert_eq!(resolve_endpoint("hola", &env).unwrap().base_url, "http://x/");
/// assert_eq!(
///     resolve_endpoint("aloha", &env).unwrap().base_url,
///     "http://aloha:8080/"
/// );
/// ```
pub fn resolve_endpoint(name: &str, env: &EnvSnapshot) -> Result<ResolvedEndpoint, ResolveError> {
    let upper = name.to_uppercase();

    let server_url_var = format!("{}_SERVER_URL", upper);
    if let Some(url) = env.get(&server_url_var) {
        debug!(service = name, base_url = url, "Resolved endpoint from {}", server_url_var);
        return Ok(ResolvedEndpoint {
            base_url: url.to_string(),
            source: EndpointSource::ServerUrl,
        });
    }

    let host_var = format!("{}_SERVICE_HOST", upper);
    if let Some(host) = env.get(&host_var) {
        let port_var = format!("{}_SERVICE_PORT", upper);
        let Some(port) = env.get(&port_var) else {
            warn!(service = name, host, "{} is set without {}", host_var, port_var);
            return Err(ResolveError::MissingPort { host_var, port_var });
        };
        let base_url = format!("http://{}:{}", host, port);
        debug!(service = name, base_url = %base_url, "Resolved endpoint from host and port");
        return Ok(ResolvedEndpoint {
            base_url,
            source: EndpointSource::HostPort,
        });
    }

    Ok(ResolvedEndpoint {
        base_url: format!("http://{}:{}/", name, DEFAULT_PORT),
        source: EndpointSource::Default,
    })
}
