// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;
use rota_core::FakeClock;

fn record(kind: RunKind, id: &str) -> HistoryRecord {
    HistoryRecord::new(kind, id, "job-1")
}

#[tokio::test]
async fn work_result_becomes_terminal_status() {
    let clock = FakeClock::new();
    let job = SpawnedJob::spawn(record(RunKind::Manual, "h-1"), Arc::new(clock.clone()), |ctx, _| async move {
        ctx.append_log("step 1");
        RunStatus::Ok
    });

    job.done().await;
    let record = job.context().record();
    assert_eq!(record.status, RunStatus::Ok);
    assert_eq!(record.end_time_ms, Some(FakeClock::START_MS));
    assert_eq!(record.log.lines(), ["step 1"]);
    assert!(!job.is_cancelled());
}

#[tokio::test]
async fn spawn_marks_running() {
    let job = SpawnedJob::spawn(record(RunKind::Scheduled, "h-2"), Arc::new(FakeClock::new()), |_, cancel| async move {
        cancel.cancelled().await;
        RunStatus::Ok
    });
    assert_eq!(job.context().record().status, RunStatus::Running);
    job.cancel();
    job.done().await;
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_work_without_finishing_record() {
    let job = SpawnedJob::spawn(record(RunKind::Debug, "h-3"), Arc::new(FakeClock::new()), |_, _| async move {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        RunStatus::Ok
    });

    job.cancel();
    job.cancel();
    job.done().await;

    assert!(job.is_cancelled());
    // the canceller owns the terminal write
    assert_eq!(job.context().record().status, RunStatus::Running);
}

#[test]
fn fake_job_counts_cancels() {
    let job = FakeJob::running(RunKind::Manual, "h-4", "job-4");
    assert_eq!(job.context().kind(), RunKind::Manual);
    assert_eq!(job.context().history_id(), "h-4");
    assert_eq!(job.context().record().status, RunStatus::Running);

    job.cancel();
    job.cancel();
    assert_eq!(job.cancel_count(), 2);
}

#[test]
fn context_mutation_is_visible_in_copies() {
    let context = JobContext::new(record(RunKind::Scheduled, "h-5"));
    context.append_log("hello");
    let finished = context.with_record(|r| r.finish(RunStatus::Failed, 7));
    assert!(finished);

    let copy = context.record();
    assert_eq!(copy.status, RunStatus::Failed);
    assert_eq!(copy.end_time_ms, Some(7));
    assert_eq!(copy.log.content(), "hello");
}
