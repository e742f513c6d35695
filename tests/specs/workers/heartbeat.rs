//! Heartbeat reporting as seen from the web gateway

use crate::prelude::*;

#[tokio::test]
async fn gateway_lists_every_worker() {
    let cluster = Cluster::start().await;
    let first = cluster.attach("worker-1").await;
    let _second = cluster.attach("worker-2").await;

    let info = first.worker.client.job_queue_info_from_web().await.unwrap();

    assert_eq!(info.keys().collect::<Vec<_>>(), ["worker-1", "worker-2"]);
    assert_eq!(info["worker-2"].cores, 4);
}

#[tokio::test]
async fn heartbeats_carry_running_ids() {
    let cluster = Cluster::start().await;
    let node = cluster.attach("worker-1").await;
    cluster.run_on(&node, HistoryRecord::new(RunKind::Scheduled, "h-1", "job-1"));
    cluster.run_on(&node, HistoryRecord::new(RunKind::Debug, "d-1", "file-1"));

    let reported = wait_for(SPEC_WAIT_MAX_MS, || {
        cluster.connection("worker-1").and_then(|c| c.last_heartbeat()).is_some_and(|info| {
            info.running == ["h-1"] && info.debug_running == ["d-1"] && info.manual_running.is_empty()
        })
    })
    .await;

    assert!(reported, "heartbeat never reported the running ids");
}
