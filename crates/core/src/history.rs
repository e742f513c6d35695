// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History records for scheduled, manual and debug runs.
//!
//! The execution layer owns these records; the tracking core reads them,
//! appends log lines and annotations, and writes the terminal status when a
//! run is cancelled.

use serde::{Deserialize, Serialize};

use crate::kind::RunKind;

/// Prefix on lines the platform itself writes into a run's log.
pub const SYSTEM_LOG_PREFIX: &str = "[rota]";

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Wait,
    Running,
    Ok,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Ok | RunStatus::Failed)
    }
}

crate::simple_display! {
    RunStatus {
        Wait => "wait",
        Running => "running",
        Ok => "ok",
        Failed => "failed",
    }
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Schedule,
    Manual,
    /// Manual re-run of a failed schedule; queued as manual but not tracked in
    /// the manual registries.
    Recovery,
    Debug,
}

impl From<RunKind> for TriggerType {
    fn from(kind: RunKind) -> Self {
        match kind {
            RunKind::Scheduled => TriggerType::Schedule,
            RunKind::Manual => TriggerType::Manual,
            RunKind::Debug => TriggerType::Debug,
        }
    }
}

/// Append-only run log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogBuffer {
    lines: Vec<String>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line of job output.
    pub fn append(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Append a platform line stamped with the given wall-clock time.
    pub fn append_system(&mut self, epoch_ms: u64, message: &str) {
        let stamp = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(epoch_ms as i64)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        self.lines.push(format!("{SYSTEM_LOG_PREFIX} {stamp} {message}"));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines written by the platform rather than the job.
    pub fn system_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str).filter(|l| l.starts_with(SYSTEM_LOG_PREFIX))
    }

    pub fn content(&self) -> String {
        self.lines.join("\n")
    }

    /// Length of [`content`](Self::content) in bytes.
    pub fn content_len(&self) -> usize {
        let newlines = self.lines.len().saturating_sub(1);
        self.lines.iter().map(String::len).sum::<usize>() + newlines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A job history or debug history record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    /// Logical job id for scheduled and manual runs; file id for debug runs.
    pub job_id: String,
    pub kind: RunKind,
    pub trigger: TriggerType,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub illustrate: Option<String>,
    #[serde(default)]
    pub log: LogBuffer,
}

impl HistoryRecord {
    pub fn new(kind: RunKind, id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            job_id: job_id.into(),
            kind,
            trigger: kind.into(),
            status: RunStatus::Wait,
            end_time_ms: None,
            illustrate: None,
            log: LogBuffer::new(),
        }
    }

    pub fn with_trigger(mut self, trigger: TriggerType) -> Self {
        self.trigger = trigger;
        self
    }

    /// Key the run is registered under on the master: the history id for
    /// debug runs, the logical job id otherwise.
    pub fn dispatch_key(&self) -> &str {
        match self.kind {
            RunKind::Debug => &self.id,
            RunKind::Scheduled | RunKind::Manual => &self.job_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move a waiting run to running. Returns false once terminal.
    pub fn mark_running(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = RunStatus::Running;
        true
    }

    /// Move back to waiting before the run reaches a terminal status.
    pub fn mark_waiting(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = RunStatus::Wait;
        true
    }

    /// Apply the single terminal transition.
    ///
    /// Returns false (and changes nothing) when the record is already terminal
    /// or `status` is not a terminal status.
    pub fn finish(&mut self, status: RunStatus, now_ms: u64) -> bool {
        if self.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.end_time_ms = Some(now_ms);
        true
    }

    /// Fold a locally finished copy of this run into the stored record.
    ///
    /// The log and notes always come from `local`. Status and end time are
    /// taken only when this record is not terminal yet. Returns whether the
    /// terminal transition was applied.
    pub fn absorb_finished(&mut self, local: &HistoryRecord) -> bool {
        self.log = local.log.clone();
        if local.illustrate.is_some() {
            self.illustrate = local.illustrate.clone();
        }
        match local.end_time_ms {
            Some(end_time_ms) => self.finish(local.status, end_time_ms),
            None => false,
        }
    }

    /// Append a note to the illustrate field, keeping earlier notes.
    pub fn annotate(&mut self, note: &str) {
        self.illustrate = match self.illustrate.take() {
            Some(existing) if !existing.trim().is_empty() => Some(format!("{existing}; {note}")),
            _ => Some(note.to_string()),
        };
    }
}

/// Live status of a logical job, used to make a cancelled scheduled job
/// eligible for scheduling again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusRecord {
    pub job_id: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

impl JobStatusRecord {
    pub fn new(job_id: impl Into<String>, status: RunStatus, history_id: Option<String>) -> Self {
        Self { job_id: job_id.into(), status, history_id }
    }

    /// Back to waiting with no owning history.
    pub fn reset_to_wait(&mut self) {
        self.status = RunStatus::Wait;
        self.history_id = None;
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
