// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn manual_record() -> HistoryRecord {
    HistoryRecord::new(RunKind::Manual, "his-1", "job-7")
}

#[yare::parameterized(
    scheduled = { RunKind::Scheduled, "job-7" },
    manual    = { RunKind::Manual,    "job-7" },
    debug     = { RunKind::Debug,     "his-1" },
)]
fn dispatch_key_by_kind(kind: RunKind, expected: &str) {
    let record = HistoryRecord::new(kind, "his-1", "job-7");
    assert_eq!(record.dispatch_key(), expected);
}

#[test]
fn finish_sets_end_time_once() {
    let mut record = manual_record();
    record.mark_running();

    assert!(record.finish(RunStatus::Failed, 100));
    assert!(!record.finish(RunStatus::Ok, 200));

    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.end_time_ms, Some(100));
}

#[test]
fn absorb_finished_keeps_stored_terminal_status() {
    let mut stored = manual_record();
    stored.finish(RunStatus::Failed, 42);

    let mut local = manual_record();
    local.log.append("late output");
    local.finish(RunStatus::Ok, 900);

    assert!(!stored.absorb_finished(&local));
    assert_eq!(stored.status, RunStatus::Failed);
    assert_eq!(stored.end_time_ms, Some(42));
    assert_eq!(stored.log.lines(), ["late output"]);
}

#[test]
fn absorb_finished_applies_first_terminal_status() {
    let mut stored = manual_record();
    stored.mark_running();
    stored.illustrate = Some("retry #2".into());

    let mut local = stored.clone();
    local.finish(RunStatus::Ok, 900);
    assert!(stored.absorb_finished(&local));
    assert_eq!(stored.status, RunStatus::Ok);
    assert_eq!(stored.end_time_ms, Some(900));
    assert_eq!(stored.illustrate.as_deref(), Some("retry #2"));
}

#[yare::parameterized(
    wait    = { RunStatus::Wait },
    running = { RunStatus::Running },
)]
fn finish_rejects_non_terminal_status(status: RunStatus) {
    let mut record = manual_record();
    assert!(!record.finish(status, 100));
    assert_eq!(record.end_time_ms, None);
}

#[test]
fn wait_and_running_flip_until_terminal() {
    let mut record = manual_record();
    assert!(record.mark_running());
    assert!(record.mark_waiting());
    assert!(record.finish(RunStatus::Ok, 1));
    assert!(!record.mark_running());
    assert!(!record.mark_waiting());
    assert_eq!(record.status, RunStatus::Ok);
}

#[yare::parameterized(
    empty      = { None,               "cancelled" },
    blank      = { Some("  "),         "cancelled" },
    existing   = { Some("retry #2"),   "retry #2; cancelled" },
)]
fn annotate_appends(existing: Option<&str>, expected: &str) {
    let mut record = manual_record();
    record.illustrate = existing.map(str::to_string);
    record.annotate("cancelled");
    assert_eq!(record.illustrate.as_deref(), Some(expected));
}

#[test]
fn system_lines_are_stamped_and_filterable() {
    let mut log = LogBuffer::new();
    log.append("hello from the job");
    log.append_system(1_767_225_600_000, "run cancelled");

    let system: Vec<&str> = log.system_lines().collect();
    assert_eq!(system, vec!["[rota] 2026-01-01 00:00:00 run cancelled"]);
    assert_eq!(log.lines().len(), 2);
    assert_eq!(log.content_len(), log.content().len());
}

#[test]
fn empty_log_has_zero_length() {
    let log = LogBuffer::new();
    assert!(log.is_empty());
    assert_eq!(log.content_len(), 0);
}

#[test]
fn job_status_reset_clears_history() {
    let mut status = JobStatusRecord::new("job-7", RunStatus::Running, Some("his-1".into()));
    status.reset_to_wait();
    assert_eq!(status.status, RunStatus::Wait);
    assert_eq!(status.history_id, None);
}

#[test]
fn record_json_omits_unset_optionals() {
    let json = serde_json::to_value(manual_record()).unwrap();
    assert!(json.get("end_time_ms").is_none());
    assert!(json.get("illustrate").is_none());
    assert_eq!(json["trigger"], "manual");
}
