//! Client configuration

use std::time::Duration;

use thiserror::Error;

/// Default server URL, matching a local Conductor server
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/api";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Server URL could not be parsed or cannot carry path segments
    #[error("invalid server URL '{0}'")]
    InvalidServerUrl(String),

    /// Auth token contains characters not allowed in an HTTP header
    #[error("auth token is not a valid header value")]
    InvalidAuthToken,

    /// Environment variable holds a value of the wrong shape
    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Configuration for [`crate::ApiClient`]
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the server API, e.g. `http://localhost:8080/api`
    pub server_url: String,
    /// Pre-issued token sent as `X-Authorization`
    pub auth_token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// User agent header
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            auth_token: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            user_agent: format!("conductor-client-rust/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_url", &self.server_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// Create a configuration pointing at the given server
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `CONDUCTOR_SERVER_URL`: Base API URL (default: `http://localhost:8080/api`)
    /// - `CONDUCTOR_AUTH_TOKEN`: Token sent as `X-Authorization`
    /// - `CONDUCTOR_HTTP_TIMEOUT_SECS`: Per-request timeout in seconds (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("CONDUCTOR_SERVER_URL") {
            config.server_url = url;
        }

        config.auth_token = std::env::var("CONDUCTOR_AUTH_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());

        if let Ok(raw) = std::env::var("CONDUCTOR_HTTP_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: "CONDUCTOR_HTTP_TIMEOUT_SECS",
                value: raw.clone(),
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Set the auth token
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
