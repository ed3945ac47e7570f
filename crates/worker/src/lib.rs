//! # Conductor Worker
//!
//! Runtime for task workers: poll the server for tasks of a given type, run
//! user code on each, report the result.
//!
//! ```text
//! ┌──────────────────────────── WorkerHost ────────────────────────────┐
//! │  thread "worker-echo-0"         thread "worker-charge-1"           │
//! │  ┌───────────────────────┐      ┌───────────────────────┐          │
//! │  │ TaskRunner            │      │ TaskRunner            │   ...    │
//! │  │ sleep → poll → process│      │ sleep → poll → process│          │
//! │  │       → update        │      │       → update        │          │
//! │  └───────────────────────┘      └───────────────────────┘          │
//! └────────────────────────────────────────────────────────────────────┘
//!                 │ TaskClient (poll / update over HTTP)
//!                 ▼
//!         Conductor server
//! ```

pub mod client;
pub mod config;
pub mod host;
pub mod runner;
pub mod telemetry;
pub mod worker;

pub use client::TaskClient;
pub use config::{ConfigError, RunnerConfig, DEFAULT_POLL_INTERVAL};
pub use host::{HostError, HostReport, ShutdownHandle, WorkerHost};
pub use runner::{IterationOutcome, RunnerError, TaskRunner};
pub use telemetry::{init_telemetry, LogFormat, TelemetryConfig};
pub use worker::{default_identity, FnWorker, Worker, WorkerError};

// Models workers deal with directly
pub use conductor_client::models::{Task, TaskResult, TaskResultStatus};
