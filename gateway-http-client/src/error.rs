//! HTTP client error types.

use std::time::Duration;
use thiserror::Error;

/// Result type for HTTP client operations.
pub type Result<T> = std::result::Result<T, HttpClientError>;

/// Failure classes of one outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// TCP/DNS/TLS failure, connection reset, unusable URL.
    Transport,
    /// Per-call deadline elapsed.
    Timeout,
    /// Downstream answered with a 5xx status.
    RemoteFailure,
    /// Downstream answered with a 4xx status and the policy counts it.
    ClientStatus,
    /// Call short-circuited by the breaker.
    BreakerOpen,
    /// Response body did not decode into the expected type.
    Decode,
}

impl ErrorKind {
    /// Value written to the span's `error.kind`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RemoteFailure => "remote_failure",
            ErrorKind::ClientStatus => "client_status",
            ErrorKind::BreakerOpen => "breaker_open",
            ErrorKind::Decode => "decode",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP client errors.
#[derive(Debug, Clone, Error)]
pub enum HttpClientError {
    /// Circuit breaker is open, rejecting requests.
    #[error("Circuit breaker is open, request rejected")]
    CircuitOpen,

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or protocol failure below HTTP.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The resolved base URL and path do not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Downstream returned a server error.
    #[error("Remote failure: {status}")]
    RemoteFailure {
        /// HTTP status code.
        status: u16,
    },

    /// Downstream returned a client error counted as failure.
    #[error("Client error status: {status}")]
    ClientStatus {
        /// HTTP status code.
        status: u16,
    },

    /// Response body did not match the expected shape.
    #[error("Failed to decode response ({status}): {message}")]
    Decode {
        /// HTTP status code of the undecodable response.
        status: u16,
        /// Decoder message.
        message: String,
    },

    /// Transport could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    /// Interceptor rejected the request.
    #[error("Interceptor error: {0}")]
    Interceptor(String),
}

impl HttpClientError {
    /// Map a reqwest failure onto the taxonomy.
    pub fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Transport(error.to_string())
        }
    }

    /// Failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CircuitOpen => ErrorKind::BreakerOpen,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::RemoteFailure { .. } => ErrorKind::RemoteFailure,
            Self::ClientStatus { .. } => ErrorKind::ClientStatus,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Transport(_) | Self::InvalidUrl(_) | Self::Build(_) | Self::Interceptor(_) => {
                ErrorKind::Transport
            }
        }
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Get the HTTP status code if a response was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RemoteFailure { status }
            | Self::ClientStatus { status }
            | Self::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }
}
