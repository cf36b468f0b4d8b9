//! Descriptions of remote operations.

use crate::{HttpClientError, Response, Result};
use http::Method;
use std::fmt;
use std::sync::Arc;

/// Decoding rule from a successful response into the call's result type.
pub type Decoder<T> = Arc<dyn Fn(&Response) -> Result<T> + Send + Sync>;

/// A remote operation: HTTP method, path relative to the service's base
/// URL, and how to decode the response body.
pub struct RemoteCall<T> {
    method: Method,
    path: String,
    decoder: Decoder<T>,
}

impl<T> Clone for RemoteCall<T> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            path: self.path.clone(),
            decoder: Arc::clone(&self.decoder),
        }
    }
}

impl<T> fmt::Debug for RemoteCall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCall")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<T> RemoteCall<T> {
    /// Create a call with a custom method and decoder.
    pub fn new<F>(method: Method, path: impl Into<String>, decoder: F) -> Self
    where
        F: Fn(&Response) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            method,
            path: path.into(),
            decoder: Arc::new(decoder),
        }
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the base URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decode a response body.
    pub fn decode(&self, response: &Response) -> Result<T> {
        (self.decoder)(response)
    }

    /// Absolute URL of this call against `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        join_url(base_url, &self.path)
    }
}

impl RemoteCall<String> {
    /// `GET {path}` returning the body verbatim as UTF-8 text.
    pub fn get_text(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path, |response: &Response| response.text())
    }
}

/// Join a base URL and a relative path with exactly one `/` between them.
///
/// Base URLs from the environment may or may not end with `/`, and paths
/// may or may not start with one.
pub fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Parse an absolute URL, mapping failures onto [`HttpClientError::InvalidUrl`].
pub(crate) fn parse_url(url: &str) -> Result<reqwest::Url> {
    reqwest::Url::parse(url).map_err(|e| HttpClientError::InvalidUrl(format!("{}: {}", url, e)))
}
