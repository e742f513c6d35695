//! Worker disconnects seen by the master

use crate::prelude::*;

#[tokio::test]
async fn lost_worker_orphans_its_runs() {
    let cluster = Cluster::start().await;
    let node = cluster.attach("worker-1").await;
    cluster.run_on(&node, HistoryRecord::new(RunKind::Scheduled, "h-1", "job-1"));
    let mut events = cluster.ctx.workers.subscribe();

    node.stop().await;

    let lost = tokio::time::timeout(Duration::from_millis(SPEC_WAIT_MAX_MS), async {
        loop {
            if let Ok(WorkerEvent::ConnectionLost { orphaned, .. }) = events.recv().await {
                return orphaned;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(lost, vec![(RunKind::Scheduled, "job-1".to_string())]);
    assert!(cluster.ctx.workers.is_empty());
}

#[tokio::test]
async fn cancel_after_loss_reports_nothing_running() {
    let cluster = Cluster::start().await;
    let gateway = cluster.attach("worker-1").await;
    let runner = cluster.attach("worker-2").await;
    cluster.run_on(&runner, HistoryRecord::new(RunKind::Scheduled, "h-1", "job-1"));

    runner.stop().await;
    let gone = wait_for(SPEC_WAIT_MAX_MS, || cluster.ctx.workers.len() == 1).await;
    assert!(gone);

    let err = gateway.worker.client.cancel_job_from_web(RunKind::Scheduled, "h-1").await.unwrap_err();

    assert!(err.to_string().contains("no queued or running"), "{err}");
    assert_eq!(cluster.record("h-1").status, RunStatus::Failed);
}
