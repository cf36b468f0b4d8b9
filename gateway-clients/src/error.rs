// Error types for client construction and configuration

use gateway_http_client::HttpClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },

    #[error("Validation error: {}", .0.join("; "))]
    ValidationError(Vec<String>),

    #[error("Transport error: {0}")]
    Transport(#[from] HttpClientError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Endpoint resolution failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// `{U}_SERVICE_HOST` is set but `{U}_SERVICE_PORT` is unset or empty.
    #[error("{host_var} is set but {port_var} is unset or empty")]
    MissingPort { host_var: String, port_var: String },
}

impl From<ResolveError> for HttpClientError {
    fn from(error: ResolveError) -> Self {
        HttpClientError::InvalidUrl(error.to_string())
    }
}
