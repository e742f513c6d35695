//! Cancelling runs that execute on a worker
//!
//! The cancel request enters through one worker's web gateway, the master
//! finds the owning connection and the owning worker stops the run.

use crate::prelude::*;

fn manual(id: &str, job_id: &str) -> HistoryRecord {
    HistoryRecord::new(RunKind::Manual, id, job_id).with_trigger(TriggerType::Manual)
}

#[tokio::test]
async fn manual_run_is_cancelled_through_another_worker() {
    let cluster = Cluster::start().await;
    let gateway = cluster.attach("worker-1").await;
    let runner = cluster.attach("worker-2").await;
    cluster.run_on(&runner, manual("h-1", "job-1"));

    let message = gateway.worker.client.cancel_job_from_web(RunKind::Manual, "h-1").await.unwrap();

    assert!(message.contains("h-1"), "{message}");
    assert!(!runner.worker.tracker.is_running(RunKind::Manual, "h-1"));
    assert!(!cluster.connection("worker-2").unwrap().owns(RunKind::Manual, "job-1"));

    let record = cluster.record("h-1");
    assert_eq!(record.status, RunStatus::Failed);
    assert!(record.end_time_ms.is_some());
    assert_eq!(record.illustrate.as_deref(), Some(CANCELLED_NOTE));
    assert!(record.log.system_lines().any(|l| l.ends_with(CANCELLED_LOG_LINE)));
}

#[tokio::test]
async fn second_cancel_finds_nothing() {
    let cluster = Cluster::start().await;
    let node = cluster.attach("worker-1").await;
    cluster.run_on(&node, manual("h-1", "job-1"));

    node.worker.client.cancel_job_from_web(RunKind::Manual, "h-1").await.unwrap();
    let err = node.worker.client.cancel_job_from_web(RunKind::Manual, "h-1").await.unwrap_err();

    assert!(matches!(err, ClientError::Rejected(_)), "{err}");
    assert!(err.to_string().contains("no queued or running"), "{err}");
    assert_eq!(cluster.record("h-1").status, RunStatus::Failed);
}

#[tokio::test]
async fn scheduled_cancel_makes_job_schedulable_again() {
    let cluster = Cluster::start().await;
    let node = cluster.attach("worker-1").await;
    cluster.store.insert_status(JobStatusRecord::new("job-7", RunStatus::Running, Some("h-7".into())));
    cluster.run_on(&node, HistoryRecord::new(RunKind::Scheduled, "h-7", "job-7"));

    node.worker.client.cancel_job_from_web(RunKind::Scheduled, "h-7").await.unwrap();

    let status = cluster.store.get_status("job-7").unwrap();
    assert_eq!(status.status, RunStatus::Wait);
    assert_eq!(status.history_id, None);
    assert_eq!(cluster.record("h-7").status, RunStatus::Failed);
}

#[tokio::test]
async fn debug_runs_are_keyed_by_history_id() {
    let cluster = Cluster::start().await;
    let node = cluster.attach("worker-1").await;
    // two debug runs of the same file
    cluster.run_on(&node, HistoryRecord::new(RunKind::Debug, "d-1", "file-1"));
    cluster.run_on(&node, HistoryRecord::new(RunKind::Debug, "d-2", "file-1"));

    node.worker.client.cancel_job_from_web(RunKind::Debug, "d-1").await.unwrap();

    assert!(!node.worker.tracker.is_running(RunKind::Debug, "d-1"));
    assert!(node.worker.tracker.is_running(RunKind::Debug, "d-2"));
    assert_eq!(cluster.record("d-1").status, RunStatus::Failed);
    assert_eq!(cluster.record("d-2").status, RunStatus::Running);
}

#[tokio::test]
async fn other_kinds_are_untouched() {
    let cluster = Cluster::start().await;
    let node = cluster.attach("worker-1").await;
    cluster.run_on(&node, HistoryRecord::new(RunKind::Scheduled, "h-1", "job-1"));
    cluster.run_on(&node, manual("h-2", "job-1"));

    node.worker.client.cancel_job_from_web(RunKind::Manual, "h-2").await.unwrap();

    assert!(node.worker.tracker.is_running(RunKind::Scheduled, "h-1"));
    assert!(cluster.connection("worker-1").unwrap().owns(RunKind::Scheduled, "job-1"));
}
