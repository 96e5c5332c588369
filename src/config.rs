use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Production endpoint used when no base URL override is supplied.
pub const DEFAULT_API_URL: &str = "https://api.cognee.ai";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "COGWIT_API_KEY";

/// Environment variable overriding [`DEFAULT_API_URL`].
pub const API_URL_VAR: &str = "COGWIT_API_URL";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be used.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Credentials and endpoint used by a [`crate::client::Cogwit`] instance.
#[derive(Clone, PartialEq, Eq)]
pub struct CogwitConfig {
    /// Opaque credential sent verbatim as the `X-Api-Key` header.
    pub api_key: String,
    /// Service root; requests go to `<base_url>/api<path>`.
    pub base_url: String,
}

impl CogwitConfig {
    /// Build a configuration pointing at the production endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Replace the base URL, e.g. for a self-hosted or local deployment.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Load configuration from environment variables (and `.env`, when present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let api_key = load_env(API_KEY_VAR)?;
        if api_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue(API_KEY_VAR.to_string()));
        }

        let config = match load_env_optional(API_URL_VAR) {
            Some(url) => Self::new(api_key).with_base_url(url),
            None => Self::new(api_key),
        };
        tracing::debug!(base_url = %config.base_url, "Loaded Cogwit configuration");
        Ok(config)
    }
}

impl fmt::Debug for CogwitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CogwitConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Timeout policy applied to every dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherSettings {
    /// Ceiling for the whole call, sized for slow server-side pipelines.
    pub request_timeout: Duration,
    /// Ceiling for establishing the connection.
    pub connect_timeout: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(2 * 60 * 60),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
