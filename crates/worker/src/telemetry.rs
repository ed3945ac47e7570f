// Logging setup for worker processes
//
// Structured `tracing` output through `tracing-subscriber`, filtered by
// `RUST_LOG` / `LOG_LEVEL`. Metrics export is not part of this crate.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, one line per event
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Configuration for logging
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log filter (e.g., "info", "conductor_worker=debug")
    pub log_filter: Option<String>,
    pub format: LogFormat,
    /// Include the event target (module path) in output
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: None,
            format: LogFormat::Pretty,
            with_target: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `RUST_LOG` or `LOG_LEVEL`: Log filter (default: "info")
    /// - `CONDUCTOR_LOG_FORMAT`: "json" for JSON lines, anything else for text
    pub fn from_env() -> Self {
        Self {
            log_filter: std::env::var("RUST_LOG")
                .ok()
                .or_else(|| std::env::var("LOG_LEVEL").ok()),
            format: match std::env::var("CONDUCTOR_LOG_FORMAT") {
                Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            with_target: true,
        }
    }

    fn filter(&self) -> EnvFilter {
        self.log_filter
            .as_ref()
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

/// Install the global subscriber
///
/// Returns `false` if a subscriber was already installed (e.g. by the
/// embedding application or a previous call), in which case nothing changes.
pub fn init_telemetry(config: TelemetryConfig) -> bool {
    let filter = config.filter();
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(config.with_target))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(config.with_target))
            .try_init(),
    };

    installed.is_ok()
}
