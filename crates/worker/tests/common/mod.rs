// Scripted in-memory server shared by the worker integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use conductor_client::ClientError;
use conductor_worker::{Task, TaskClient, TaskResult};
use tokio::sync::watch;

/// What the next poll returns
#[derive(Debug, Clone)]
pub enum PollStep {
    Task(Task),
    Empty,
    /// Server answers with this HTTP status
    Fail(u16),
    /// The poll call itself panics
    Panic,
}

/// Panic payload whose destructor panics
pub struct PanicOnDrop;

impl Drop for PanicOnDrop {
    fn drop(&mut self) {
        panic!("panic payload dropped");
    }
}

/// Fake server: answers polls from a script, records every update
///
/// Once the script is used up, polls either keep serving fresh tasks
/// (`serving`) or return nothing.
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<PollStep>>,
    serving: bool,
    polls: Mutex<HashMap<String, usize>>,
    updates: Mutex<Vec<TaskResult>>,
    failing_updates: Mutex<usize>,
    crashing: Option<String>,
    stop: Mutex<Option<(usize, watch::Sender<bool>)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a new task of the polled type on every unscripted poll
    pub fn serving() -> Self {
        Self {
            serving: true,
            ..Self::default()
        }
    }

    pub fn with_script(self, steps: impl IntoIterator<Item = PollStep>) -> Self {
        self.script.lock().unwrap().extend(steps);
        self
    }

    /// Every poll for `task_type` panics with a payload that panics again when
    /// dropped, which takes down the runner thread that caught it
    pub fn crashing_on(mut self, task_type: impl Into<String>) -> Self {
        self.crashing = Some(task_type.into());
        self
    }

    /// Fail the next `count` updates with a 500
    pub fn with_failing_updates(self, count: usize) -> Self {
        *self.failing_updates.lock().unwrap() = count;
        self
    }

    /// Flip `tx` to `true` once `polls` polls have been answered
    pub fn stop_after(self, polls: usize, tx: watch::Sender<bool>) -> Self {
        *self.stop.lock().unwrap() = Some((polls, tx));
        self
    }

    pub fn total_polls(&self) -> usize {
        self.polls.lock().unwrap().values().sum()
    }

    pub fn polls_for(&self, task_type: &str) -> usize {
        self.polls
            .lock()
            .unwrap()
            .get(task_type)
            .copied()
            .unwrap_or(0)
    }

    pub fn updates(&self) -> Vec<TaskResult> {
        self.updates.lock().unwrap().clone()
    }

    pub fn updates_for(&self, task_type: &str) -> Vec<TaskResult> {
        let prefix = format!("{}-", task_type);
        self.updates()
            .into_iter()
            .filter(|r| r.task_id.starts_with(&prefix))
            .collect()
    }

    fn record_poll(&self, task_type: &str) -> usize {
        let count = {
            let mut polls = self.polls.lock().unwrap();
            let entry = polls.entry(task_type.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        let total = self.total_polls();
        if let Some((after, tx)) = self.stop.lock().unwrap().as_ref() {
            if total >= *after {
                tx.send_replace(true);
            }
        }
        count
    }
}

#[async_trait]
impl TaskClient for ScriptedClient {
    async fn poll(
        &self,
        task_type: &str,
        _worker_id: &str,
        _domain: Option<&str>,
    ) -> Result<Option<Task>, ClientError> {
        let count = self.record_poll(task_type);
        if self.crashing.as_deref() == Some(task_type) {
            std::panic::panic_any(PanicOnDrop);
        }
        let step = self.script.lock().unwrap().pop_front();

        match step {
            Some(PollStep::Task(task)) => Ok(Some(task)),
            Some(PollStep::Empty) => Ok(None),
            Some(PollStep::Fail(status)) => Err(ClientError::Api {
                status,
                message: "service unavailable".to_string(),
            }),
            Some(PollStep::Panic) => panic!("connection pool poisoned"),
            None if self.serving => Ok(Some(Task::new(
                format!("{}-{}", task_type, count),
                format!("wf-{}", task_type),
                task_type,
            ))),
            None => Ok(None),
        }
    }

    async fn update(&self, result: &TaskResult) -> Result<(), ClientError> {
        {
            let mut failing = self.failing_updates.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(ClientError::Api {
                    status: 500,
                    message: "internal error".to_string(),
                });
            }
        }
        self.updates.lock().unwrap().push(result.clone());
        Ok(())
    }
}
