//! Runs that finish on their own
//!
//! The worker reports the finish, so the master stops treating the run as
//! live and the same job can be dispatched again.

use crate::prelude::*;

/// Dispatch `record` on `node` and let it finish with OK right away.
async fn finish_on(cluster: &Cluster, node: &Node, mut record: HistoryRecord) {
    record.mark_running();
    cluster.store.insert(record.clone());
    cluster.dispatch(node, &record).unwrap();
    let (kind, key, id) = (record.kind, record.dispatch_key().to_string(), record.id.clone());

    let job = node.worker.run_job(record, |_, _| async { RunStatus::Ok }).unwrap();
    job.done().await;

    let connection = cluster.connection(&node.host).unwrap();
    let released = wait_for(SPEC_WAIT_MAX_MS, || {
        !node.worker.tracker.is_running(kind, &id) && !connection.owns(kind, &key)
    })
    .await;
    assert!(released, "master still owns {kind} run {key}");
}

#[tokio::test]
async fn finished_run_can_be_dispatched_again() {
    let cluster = Cluster::start().await;
    let node = cluster.attach("worker-1").await;
    finish_on(&cluster, &node, HistoryRecord::new(RunKind::Manual, "h-9", "job-9")).await;

    assert_eq!(cluster.record("h-9").status, RunStatus::Ok);
    let rerun = HistoryRecord::new(RunKind::Manual, "h-10", "job-9");
    assert!(cluster.dispatch(&node, &rerun).is_ok());
}

#[tokio::test]
async fn cancel_after_finish_leaves_schedule_alone() {
    let cluster = Cluster::start().await;
    let node = cluster.attach("worker-1").await;
    cluster.store.insert_status(JobStatusRecord::new("job-3", RunStatus::Ok, Some("h-3".into())));
    finish_on(&cluster, &node, HistoryRecord::new(RunKind::Scheduled, "h-3", "job-3")).await;

    let err = node.worker.client.cancel_job_from_web(RunKind::Scheduled, "h-3").await.unwrap_err();

    assert!(err.to_string().contains("no queued or running"), "{err}");
    assert_eq!(cluster.record("h-3").status, RunStatus::Ok);
    assert_eq!(cluster.store.get_status("job-3").unwrap().status, RunStatus::Ok);
}
