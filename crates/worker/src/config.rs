//! Runner configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Poll interval used when neither the config nor the worker sets one
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Configuration shared by every runner a host builds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnerConfig {
    /// Idle time before every poll, including the first
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,

    /// Task domain to poll in; `None` polls the default domain
    pub domain: Option<String>,

    /// Worker id sent with polls and results; defaults to the worker's identity
    pub worker_id: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            domain: None,
            worker_id: None,
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `CONDUCTOR_POLL_INTERVAL_MS`: Poll interval in milliseconds (default: 5000)
    /// - `CONDUCTOR_WORKER_DOMAIN`: Task domain
    /// - `CONDUCTOR_WORKER_ID`: Worker id override
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("CONDUCTOR_POLL_INTERVAL_MS") {
            let millis: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: "CONDUCTOR_POLL_INTERVAL_MS",
                value: raw.clone(),
            })?;
            config.poll_interval = Duration::from_millis(millis);
        }

        config.domain = std::env::var("CONDUCTOR_WORKER_DOMAIN")
            .ok()
            .filter(|d| !d.is_empty());
        config.worker_id = std::env::var("CONDUCTOR_WORKER_ID")
            .ok()
            .filter(|id| !id.is_empty());

        Ok(config)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_worker_id(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = Some(worker_id.into());
        self
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
