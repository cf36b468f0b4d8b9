//! Gateway configuration.
//!
//! Sources, lowest precedence first: built-in defaults, a TOML file, a
//! `.env` file and `GATEWAY_*` environment variables.

use crate::{ConfigError, EnvSnapshot, Result};
use gateway_http_client::{CircuitBreakerConfig, HttpClientConfig};
use gateway_telemetry::{LogConfig, LogFormat, TelemetryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Circuit breaker settings, applied per service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_ratio_threshold: f64,
    pub window_size: usize,
    pub minimum_samples: usize,
    pub open_state_duration_ms: u64,
    pub half_open_probe_count: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_ratio_threshold: 0.5,
            window_size: 20,
            minimum_samples: 10,
            open_state_duration_ms: 5_000,
            half_open_probe_count: 1,
        }
    }
}

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub call_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub pool_idle_timeout_ms: u64,
    pub pool_max_idle_per_host: usize,
    pub user_agent: Option<String>,
    pub client_errors_are_failures: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            call_timeout_ms: 1_000,
            connect_timeout_ms: 500,
            pool_idle_timeout_ms: 90_000,
            pool_max_idle_per_host: 32,
            user_agent: None,
            client_errors_are_failures: false,
        }
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub breaker: BreakerSettings,
    pub http: HttpSettings,
    pub telemetry: TelemetryConfig,
    pub logging: LogConfig,
}

impl GatewayConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))
    }

    /// Load a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from all sources and validate.
    ///
    /// Reads `.env` from the working directory if present, then the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let dotenv = Path::new(".env");
        Self::load_with(
            path,
            dotenv.is_file().then_some(dotenv),
            &EnvSnapshot::capture(),
        )
    }

    /// Load from an optional TOML file, an optional `.env` file and `env`,
    /// then validate.
    ///
    /// Variables set in `env` win over the same keys in the `.env` file.
    pub fn load_with(path: Option<&Path>, dotenv: Option<&Path>, env: &EnvSnapshot) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let overrides = match dotenv {
            Some(dotenv) => read_dotenv(dotenv)?.overlay(env),
            None => env.clone(),
        };

        config.apply_env(&overrides)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GATEWAY_*` overrides from `env`.
    pub fn apply_env(&mut self, env: &EnvSnapshot) -> Result<()> {
        override_from(env, "GATEWAY_CALL_TIMEOUT_MS", &mut self.http.call_timeout_ms)?;
        override_from(
            env,
            "GATEWAY_BREAKER_FAILURE_RATIO",
            &mut self.breaker.failure_ratio_threshold,
        )?;
        override_from(env, "GATEWAY_BREAKER_WINDOW_SIZE", &mut self.breaker.window_size)?;
        override_from(
            env,
            "GATEWAY_BREAKER_MINIMUM_SAMPLES",
            &mut self.breaker.minimum_samples,
        )?;
        override_from(
            env,
            "GATEWAY_BREAKER_OPEN_MS",
            &mut self.breaker.open_state_duration_ms,
        )?;
        override_from(
            env,
            "GATEWAY_BREAKER_HALF_OPEN_PROBES",
            &mut self.breaker.half_open_probe_count,
        )?;

        if let Some(level) = env.get("GATEWAY_LOG_LEVEL") {
            self.logging.level = level.to_string();
        }
        if let Some(format) = env.get("GATEWAY_LOG_FORMAT") {
            self.logging.format = LogFormat::parse(format).ok_or_else(|| ConfigError::InvalidEnv {
                key: "GATEWAY_LOG_FORMAT".to_string(),
                value: format.to_string(),
            })?;
        }
        Ok(())
    }

    /// Check every range constraint, reporting all violations at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        let breaker = &self.breaker;

        if !(breaker.failure_ratio_threshold > 0.0 && breaker.failure_ratio_threshold <= 1.0) {
            errors.push(format!(
                "breaker.failure_ratio_threshold must be in (0, 1], got {}",
                breaker.failure_ratio_threshold
            ));
        }
        if breaker.window_size < 1 {
            errors.push("breaker.window_size must be at least 1".to_string());
        }
        if breaker.minimum_samples < 1 {
            errors.push("breaker.minimum_samples must be at least 1".to_string());
        }
        if breaker.minimum_samples > breaker.window_size {
            errors.push(format!(
                "breaker.minimum_samples ({}) must not exceed breaker.window_size ({})",
                breaker.minimum_samples, breaker.window_size
            ));
        }
        if breaker.half_open_probe_count < 1 {
            errors.push("breaker.half_open_probe_count must be at least 1".to_string());
        }
        if breaker.open_state_duration_ms == 0 {
            errors.push("breaker.open_state_duration_ms must be non-zero".to_string());
        }
        if self.http.call_timeout_ms == 0 {
            errors.push("http.call_timeout_ms must be non-zero".to_string());
        }
        if let Err(e) = self.telemetry.validate() {
            errors.push(e.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(errors))
        }
    }

    /// Runtime breaker configuration.
    pub fn circuit_breaker(&self) -> CircuitBreakerConfig {
        let breaker = &self.breaker;
        CircuitBreakerConfig::new(
            breaker.failure_ratio_threshold,
            Duration::from_millis(breaker.open_state_duration_ms),
        )
        .with_window_size(breaker.window_size)
        .with_minimum_samples(breaker.minimum_samples)
        .with_half_open_probe_count(breaker.half_open_probe_count)
    }

    /// Runtime transport configuration, breaker included.
    pub fn http_client(&self) -> HttpClientConfig {
        let http = &self.http;
        let mut builder = HttpClientConfig::builder()
            .call_timeout(Duration::from_millis(http.call_timeout_ms))
            .connect_timeout(Duration::from_millis(http.connect_timeout_ms))
            .pool_idle_timeout(Duration::from_millis(http.pool_idle_timeout_ms))
            .pool_max_idle_per_host(http.pool_max_idle_per_host)
            .client_errors_are_failures(http.client_errors_are_failures)
            .circuit_breaker(self.circuit_breaker());
        if let Some(user_agent) = &http.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        builder.build()
    }
}

fn read_dotenv(path: &Path) -> Result<EnvSnapshot> {
    let load_error =
        |e: dotenvy::Error| ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e));

    let mut pairs = Vec::new();
    for item in dotenvy::from_path_iter(path).map_err(load_error)? {
        pairs.push(item.map_err(load_error)?);
    }
    tracing::debug!(path = %path.display(), vars = pairs.len(), "Loaded .env file");
    Ok(EnvSnapshot::from_pairs(pairs))
}

fn override_from<T: FromStr>(env: &EnvSnapshot, key: &str, target: &mut T) -> Result<()> {
    if let Some(raw) = env.get(key) {
        *target = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            key: key.to_string(),
            value: raw.to_string(),
        })?;
    }
    Ok(())
}
