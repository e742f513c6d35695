//! Cancels that find nothing to stop

use crate::prelude::*;

#[tokio::test]
async fn unknown_history_is_an_error_without_writes() {
    let cluster = Cluster::start().await;
    let node = cluster.attach("worker-1").await;

    let err = node.worker.client.cancel_job_from_web(RunKind::Manual, "nope").await.unwrap_err();

    assert!(err.to_string().contains("nope"), "{err}");
    assert_eq!(cluster.store.calls(), vec![StoreCall::Find("nope".into())]);
}

#[tokio::test]
async fn unowned_run_is_reported_and_failed() {
    let cluster = Cluster::start().await;
    let node = cluster.attach("worker-1").await;
    let mut record = HistoryRecord::new(RunKind::Manual, "h-1", "job-1");
    record.mark_running();
    cluster.store.insert(record);

    let err = node.worker.client.cancel_job_from_web(RunKind::Manual, "h-1").await.unwrap_err();

    let text = err.to_string();
    assert!(text.contains("job-1") && text.contains("h-1"), "{text}");
    assert_eq!(cluster.record("h-1").status, RunStatus::Failed);
}

#[tokio::test]
async fn recovery_runs_are_not_searched_for() {
    let cluster = Cluster::start().await;
    let node = cluster.attach("worker-1").await;
    let record = HistoryRecord::new(RunKind::Manual, "h-1", "job-1").with_trigger(TriggerType::Recovery);
    cluster.run_on(&node, record);

    let err = node.worker.client.cancel_job_from_web(RunKind::Manual, "h-1").await.unwrap_err();

    assert!(matches!(err, ClientError::Rejected(_)), "{err}");
    assert!(node.worker.tracker.is_running(RunKind::Manual, "h-1"));
}
