//! Worker host
//!
//! Runs one [`TaskRunner`] per worker, each on its own OS thread with a private
//! single-threaded runtime. Runners share nothing mutable: a handler that hangs
//! or panics only affects its own thread.
//!
//! # Example
//!
//! ```ignore
//! let client = ConductorClient::new(&ClientConfig::from_env()?)?;
//! let host = WorkerHost::new(
//!     vec![Arc::new(EchoWorker) as Arc<dyn Worker>, Arc::new(ChargeWorker)],
//!     Arc::new(client.tasks()),
//!     RunnerConfig::from_env()?,
//! )?;
//!
//! // Blocks until every runner exits, which normally never happens
//! let report = host.start();
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::client::TaskClient;
use crate::config::RunnerConfig;
use crate::runner::{panic_message, RunnerError, TaskRunner};
use crate::worker::Worker;

#[derive(Debug, Error)]
pub enum HostError {
    /// A worker could not be turned into a runner
    #[error("worker #{index} is invalid: {source}")]
    Runner {
        index: usize,
        #[source]
        source: RunnerError,
    },
}

/// Counts of how the runner threads ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostReport {
    /// Threads launched
    pub started: usize,
    /// Threads that returned normally (after shutdown)
    pub exited: usize,
    /// Threads that failed to launch, failed to build a runtime, or panicked
    pub crashed: usize,
}

/// Asks every runner of a host to stop after its current iteration
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        // Stored even with no live receivers, so runners started later see it
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Coordinator that owns one runner per worker
pub struct WorkerHost {
    runners: Vec<TaskRunner>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl WorkerHost {
    /// Build one runner per worker; nothing runs until [`WorkerHost::start`]
    pub fn new(
        workers: Vec<Arc<dyn Worker>>,
        client: Arc<dyn TaskClient>,
        config: RunnerConfig,
    ) -> Result<Self, HostError> {
        let runners = workers
            .into_iter()
            .enumerate()
            .map(|(index, worker)| {
                TaskRunner::new(worker, Arc::clone(&client), config.clone())
                    .map_err(|source| HostError::Runner { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            runners,
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }

    /// Number of prepared runners
    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Handle for stopping the runners from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Launch every runner and block until all of them have exited
    ///
    /// Must not be called from inside an async runtime; use
    /// `tokio::task::spawn_blocking` there.
    pub fn start(self) -> HostReport {
        let WorkerHost {
            runners,
            shutdown_tx,
        } = self;
        let mut report = HostReport::default();
        let mut handles: Vec<(String, JoinHandle<std::io::Result<()>>)> = Vec::new();

        for (index, runner) in runners.into_iter().enumerate() {
            let name = format!("worker-{}-{}", runner.task_type(), index);
            let shutdown_rx = shutdown_tx.subscribe();

            match thread::Builder::new()
                .name(name.clone())
                .spawn(move || run_isolated(runner, shutdown_rx))
            {
                Ok(handle) => {
                    report.started += 1;
                    handles.push((name, handle));
                }
                Err(e) => {
                    error!(thread = %name, error = %e, "Failed to launch runner thread");
                    report.crashed += 1;
                }
            }
        }

        info!(runners = report.started, "Worker host started");

        for (name, handle) in handles {
            match handle.join() {
                Ok(Ok(())) => {
                    debug!(thread = %name, "Runner thread exited");
                    report.exited += 1;
                }
                Ok(Err(e)) => {
                    error!(thread = %name, error = %e, "Runner thread could not build its runtime");
                    report.crashed += 1;
                }
                Err(panic) => {
                    error!(
                        thread = %name,
                        error = %panic_message(panic.as_ref()),
                        "Runner thread panicked"
                    );
                    report.crashed += 1;
                }
            }
        }

        info!(
            exited = report.exited,
            crashed = report.crashed,
            "Worker host stopped"
        );
        report
    }
}

impl std::fmt::Debug for WorkerHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHost")
            .field("runners", &self.runners)
            .finish()
    }
}

/// Thread entry point: private runtime, then the runner loop
fn run_isolated(runner: TaskRunner, shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(runner.run_until(shutdown_rx));
    Ok(())
}
