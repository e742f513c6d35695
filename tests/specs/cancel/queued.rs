//! Cancelling runs that have not been dispatched yet

use crate::prelude::*;

#[tokio::test]
async fn queued_run_is_withdrawn_without_contacting_workers() {
    let cluster = Cluster::start().await;
    let node = cluster.attach("worker-1").await;
    cluster.store.insert(HistoryRecord::new(RunKind::Scheduled, "h-1", "job-1"));
    cluster.queue.enqueue(RunKind::Scheduled, "h-1").await;

    node.worker.client.cancel_job_from_web(RunKind::Scheduled, "h-1").await.unwrap();

    assert!(cluster.queue.is_empty().await);
    let record = cluster.record("h-1");
    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.log.system_lines().count(), 1);
}

#[tokio::test]
async fn other_queued_runs_stay_queued() {
    let cluster = Cluster::start().await;
    let node = cluster.attach("worker-1").await;
    cluster.store.insert(HistoryRecord::new(RunKind::Debug, "d-1", "file-1"));
    cluster.store.insert(HistoryRecord::new(RunKind::Debug, "d-2", "file-1"));
    cluster.queue.enqueue(RunKind::Debug, "d-1").await;
    cluster.queue.enqueue(RunKind::Debug, "d-2").await;

    node.worker.client.cancel_job_from_web(RunKind::Debug, "d-2").await.unwrap();

    assert_eq!(cluster.queue.len().await, 1);
    assert_eq!(cluster.queue.next().await, Some((RunKind::Debug, "d-1".to_string())));
    assert_eq!(cluster.record("d-1").status, RunStatus::Wait);
}
