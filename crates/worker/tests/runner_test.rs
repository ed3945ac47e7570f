// Integration tests for TaskRunner against a scripted server
//
// Run with: cargo test -p conductor-worker --test runner_test

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{PollStep, ScriptedClient};
use conductor_worker::{
    FnWorker, IterationOutcome, RunnerConfig, Task, TaskResult, TaskResultStatus, TaskRunner,
    WorkerError,
};
use serde_json::json;
use tokio::sync::watch;

fn fast_config() -> RunnerConfig {
    RunnerConfig::new()
        .with_poll_interval(Duration::from_millis(5))
        .with_worker_id("test-host")
}

fn echo_task() -> Task {
    let mut input = serde_json::Map::new();
    input.insert("x".to_string(), json!(1));
    Task::new("t1", "wf1", "echo").with_input(input)
}

#[tokio::test]
async fn test_successful_task_is_reported_completed() {
    let client = Arc::new(ScriptedClient::new().with_script([PollStep::Task(echo_task())]));
    let worker = FnWorker::new("echo", |task| {
        let x = task.input("x").and_then(|v| v.as_i64()).unwrap_or(0);
        Ok(TaskResult::new(task).with_output("y", x + 1))
    });
    let runner = TaskRunner::new(Arc::new(worker), client.clone(), fast_config()).unwrap();

    let outcome = runner.run_once().await;
    assert_eq!(outcome, IterationOutcome::Reported(TaskResultStatus::Completed));

    let updates = client.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].task_id, "t1");
    assert_eq!(updates[0].workflow_instance_id, "wf1");
    assert_eq!(updates[0].status, TaskResultStatus::Completed);
    assert_eq!(updates[0].output_data["y"], 2);
    assert_eq!(updates[0].worker_id.as_deref(), Some("test-host"));
}

#[tokio::test]
async fn test_normal_return_completes_whatever_status_was_set() {
    let client = Arc::new(ScriptedClient::new().with_script([
        PollStep::Task(Task::new("t1", "wf1", "echo")),
        PollStep::Task(Task::new("t2", "wf1", "echo")),
    ]));
    let worker = FnWorker::new("echo", |task| {
        if task.task_id == "t1" {
            Ok(TaskResult::in_progress(task, Duration::from_secs(30)))
        } else {
            Ok(TaskResult::failed(task, "returned normally"))
        }
    });
    let runner = TaskRunner::new(Arc::new(worker), client.clone(), fast_config()).unwrap();

    for _ in 0..2 {
        assert_eq!(
            runner.run_once().await,
            IterationOutcome::Reported(TaskResultStatus::Completed)
        );
    }

    let updates = client.updates();
    assert_eq!(updates.len(), 2);
    assert!(updates.iter().all(|r| r.status == TaskResultStatus::Completed
        && r.reason_for_incompletion.is_none()
        && r.callback_after_seconds == 0));
}

#[tokio::test]
async fn test_worker_error_is_reported_failed() {
    let client = Arc::new(ScriptedClient::new().with_script([PollStep::Task(echo_task())]));
    let worker = FnWorker::new("echo", |_task| Err(WorkerError::failed("bad input")));
    let runner = TaskRunner::new(Arc::new(worker), client.clone(), fast_config()).unwrap();

    let outcome = runner.run_once().await;
    assert_eq!(outcome, IterationOutcome::Reported(TaskResultStatus::Failed));

    let updates = client.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].task_id, "t1");
    assert_eq!(updates[0].status, TaskResultStatus::Failed);
    assert_eq!(updates[0].reason_for_incompletion.as_deref(), Some("bad input"));
}

#[tokio::test]
async fn test_worker_panic_is_reported_failed() {
    let client = Arc::new(ScriptedClient::new().with_script([PollStep::Task(echo_task())]));
    let worker = FnWorker::new("echo", |_task| -> Result<TaskResult, WorkerError> {
        panic!("index out of bounds")
    });
    let runner = TaskRunner::new(Arc::new(worker), client.clone(), fast_config()).unwrap();

    let outcome = runner.run_once().await;
    assert_eq!(outcome, IterationOutcome::Reported(TaskResultStatus::Failed));

    let updates = client.updates();
    assert_eq!(updates[0].status, TaskResultStatus::Failed);
    assert_eq!(
        updates[0].reason_for_incompletion.as_deref(),
        Some("index out of bounds")
    );
}

#[tokio::test]
async fn test_worker_not_invoked_without_task() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let client = Arc::new(ScriptedClient::new());
    let worker = FnWorker::new("echo", move |task| {
        counted.fetch_add(1, Ordering::SeqCst);
        Ok(TaskResult::new(task))
    });
    let runner = TaskRunner::new(Arc::new(worker), client.clone(), fast_config()).unwrap();

    for _ in 0..3 {
        assert_eq!(runner.run_once().await, IterationOutcome::NoTask);
    }

    assert_eq!(client.total_polls(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(client.updates().is_empty());
}

#[tokio::test]
async fn test_poll_failures_do_not_stop_the_loop() {
    let client = Arc::new(ScriptedClient::new().with_script([
        PollStep::Fail(503),
        PollStep::Fail(503),
        PollStep::Fail(503),
    ]));
    let worker = FnWorker::new("echo", |task| Ok(TaskResult::new(task)));
    let runner = TaskRunner::new(Arc::new(worker), client.clone(), fast_config()).unwrap();

    for _ in 0..3 {
        assert_eq!(runner.run_once().await, IterationOutcome::PollFailed);
    }
    // Fourth poll still happens and the script is exhausted
    assert_eq!(runner.run_once().await, IterationOutcome::NoTask);
    assert_eq!(client.total_polls(), 4);
}

#[tokio::test]
async fn test_run_until_survives_poll_errors_and_panics() {
    let (tx, rx) = watch::channel(false);
    let client = Arc::new(
        ScriptedClient::new()
            .with_script([
                PollStep::Fail(503),
                PollStep::Panic,
                PollStep::Fail(500),
                PollStep::Task(echo_task()),
            ])
            .stop_after(5, tx),
    );
    let worker = FnWorker::new("echo", |task| Ok(TaskResult::new(task).with_output("ok", true)));
    let runner = TaskRunner::new(Arc::new(worker), client.clone(), fast_config()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), runner.run_until(rx))
        .await
        .expect("runner should stop once shutdown is signalled");

    assert_eq!(client.total_polls(), 5);
    let updates = client.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].task_id, "t1");
    assert_eq!(updates[0].status, TaskResultStatus::Completed);
}

#[tokio::test]
async fn test_report_failure_does_not_stop_the_loop() {
    let client = Arc::new(
        ScriptedClient::new()
            .with_script([
                PollStep::Task(Task::new("t1", "wf1", "echo")),
                PollStep::Task(Task::new("t2", "wf1", "echo")),
            ])
            .with_failing_updates(1),
    );
    let worker = FnWorker::new("echo", |task| Ok(TaskResult::new(task)));
    let runner = TaskRunner::new(Arc::new(worker), client.clone(), fast_config()).unwrap();

    assert_eq!(
        runner.run_once().await,
        IterationOutcome::ReportFailed(TaskResultStatus::Completed)
    );
    assert_eq!(
        runner.run_once().await,
        IterationOutcome::Reported(TaskResultStatus::Completed)
    );

    // The first result is dropped, not retried
    let updates = client.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].task_id, "t2");
}

#[tokio::test(start_paused = true)]
async fn test_waits_before_first_poll() {
    let client = Arc::new(ScriptedClient::new());
    let worker = FnWorker::new("echo", |task| Ok(TaskResult::new(task)))
        .with_poll_interval(Duration::from_secs(5));
    let runner = TaskRunner::new(Arc::new(worker), client.clone(), RunnerConfig::default()).unwrap();

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn({
        let client = client.clone();
        async move {
            tokio::select! {
                _ = runner.run_until(rx) => {}
                _ = tokio::time::sleep(Duration::from_secs(60)) => {}
            }
            client.total_polls()
        }
    });

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert_eq!(client.total_polls(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.total_polls(), 1);

    tx.send_replace(true);
    assert_eq!(handle.await.unwrap(), 1);
}

#[tokio::test]
async fn test_run_until_stops_immediately_when_already_shut_down() {
    let client = Arc::new(ScriptedClient::serving());
    let worker = FnWorker::new("echo", |task| Ok(TaskResult::new(task)));
    let runner = TaskRunner::new(Arc::new(worker), client.clone(), fast_config()).unwrap();

    let (tx, rx) = watch::channel(false);
    tx.send_replace(true);
    runner.run_until(rx).await;

    assert_eq!(client.total_polls(), 0);
}
