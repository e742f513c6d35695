// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run cancellation.
//!
//! A cancel resolves the run's dispatch key from its history record, then
//! either withdraws the run from the pending queue or scans every connected
//! worker for it. Each owning connection has the run removed from its
//! registry before the cancel RPC goes out. The scan never stops early and a
//! slow worker only costs its own RPC timeout.
//!
//! Whatever the scan finds, the history record is re-read afterwards and
//! forced to FAILED. A record that already reached a terminal status keeps it.

use std::sync::Arc;
use std::time::Duration;

use rota_core::{
    Clock, ConnectionId, HistoryError, HistoryStores, JobStatusRecord, RunKind, RunStatus,
    TriggerType,
};
use rota_wire::{Operate, WebRequest, WebResponse};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::connection::RpcOutcome;
use crate::queue::RunQueue;
use crate::registry::WorkerRegistry;

/// Per-kind differences in how a cancel is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindPolicy {
    /// Put the logical job back to WAIT when a live run was found.
    pub resets_job_status: bool,
    /// Only scan workers when the run was started by this trigger.
    pub scan_trigger: Option<TriggerType>,
}

impl KindPolicy {
    pub fn for_kind(kind: RunKind) -> Self {
        match kind {
            RunKind::Scheduled => Self { resets_job_status: true, scan_trigger: None },
            // recovery re-runs are queued as manual but never tracked as manual
            RunKind::Manual => {
                Self { resets_job_status: false, scan_trigger: Some(TriggerType::Manual) }
            }
            RunKind::Debug => Self { resets_job_status: false, scan_trigger: None },
        }
    }

    fn scans(&self, trigger: TriggerType) -> bool {
        match self.scan_trigger {
            Some(only) => only == trigger,
            None => true,
        }
    }
}

/// Errors that stop a cancel before anything is changed.
#[derive(Debug, Error)]
pub enum CancelError {
    #[error("{kind} history {id} not found")]
    HistoryNotFound { kind: RunKind, id: String },

    #[error("history store error: {0}")]
    History(#[from] HistoryError),
}

/// One cancel RPC sent during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelSignal {
    pub connection: ConnectionId,
    pub host: String,
    pub outcome: RpcOutcome,
}

/// Everything a cancel did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReport {
    pub kind: RunKind,
    pub history_id: String,
    pub job_id: String,
    pub dispatch_key: String,
    /// Withdrawn from the pending queue; no worker was contacted.
    pub queued: bool,
    pub signals: Vec<CancelSignal>,
    /// This cancel performed the terminal history write.
    pub finalized: bool,
}

impl CancelReport {
    pub fn matched(&self) -> bool {
        self.queued || !self.signals.is_empty()
    }

    /// Error text for a cancel that found nothing.
    pub fn miss_text(&self) -> String {
        format!(
            "no queued or running {} run for job {} (history {})",
            self.kind, self.job_id, self.history_id
        )
    }
}

pub struct CancellationCoordinator {
    workers: Arc<WorkerRegistry>,
    queue: Arc<dyn RunQueue>,
    stores: HistoryStores,
    clock: Arc<dyn Clock>,
    rpc_timeout: Duration,
}

impl CancellationCoordinator {
    pub fn new(
        workers: Arc<WorkerRegistry>,
        queue: Arc<dyn RunQueue>,
        stores: HistoryStores,
        clock: Arc<dyn Clock>,
        rpc_timeout: Duration,
    ) -> Self {
        Self { workers, queue, stores, clock, rpc_timeout }
    }

    /// Cancel run `id` of `kind`.
    pub async fn cancel(&self, kind: RunKind, id: &str) -> Result<CancelReport, CancelError> {
        let policy = KindPolicy::for_kind(kind);
        let store = self.stores.for_kind(kind);
        let mut record = match store.find(id).await {
            Ok(record) => record,
            Err(HistoryError::NotFound(_)) => {
                return Err(CancelError::HistoryNotFound { kind, id: id.to_string() })
            }
            Err(e) => return Err(e.into()),
        };

        let mut report = CancelReport {
            kind,
            history_id: id.to_string(),
            job_id: record.job_id.clone(),
            dispatch_key: record.dispatch_key().to_string(),
            queued: false,
            signals: Vec::new(),
            finalized: false,
        };

        if self.queue.withdraw(kind, id).await {
            report.queued = true;
            record.log.append_system(self.clock.epoch_ms(), "run cancelled before dispatch");
            if let Err(e) = store.update_log(&record).await {
                warn!(history_id = %id, error = %e, "failed to persist queued-cancel log line");
            }
            info!(kind = %kind, history_id = %id, "cancelled queued run");
        } else if policy.scans(record.trigger) {
            report.signals = self.scan(kind, id, &report.dispatch_key).await;
        } else {
            debug!(kind = %kind, history_id = %id, trigger = ?record.trigger, "trigger not tracked, skipping worker scan");
        }

        report.finalized = self.finalize(kind, id).await;

        if policy.resets_job_status && report.matched() {
            self.reset_job_status(&report.job_id).await;
        }

        if !report.matched() {
            warn!(kind = %kind, job_id = %report.job_id, history_id = %id, "cancel found no queued or running run");
        }
        Ok(report)
    }

    /// Answer a forwarded web operation.
    pub async fn handle_web(&self, request: &WebRequest) -> WebResponse {
        match request.operate {
            Operate::Cancel => {
                let (Some(kind), Some(id)) = (request.kind, request.id.as_deref()) else {
                    return WebResponse::error(request, "cancel requires a run kind and id");
                };
                match self.cancel(kind, id).await {
                    Ok(report) if report.matched() => WebResponse::ok(request),
                    Ok(report) => WebResponse::error(request, report.miss_text()),
                    Err(e) => WebResponse::error(request, e.to_string()),
                }
            }
            Operate::HeartbeatInfo => {
                WebResponse::ok(request).with_heartbeats(self.workers.heartbeats())
            }
        }
    }

    async fn scan(&self, kind: RunKind, id: &str, key: &str) -> Vec<CancelSignal> {
        let mut signals = Vec::new();
        for connection in self.workers.snapshot() {
            // removal happens before the RPC; a concurrent cancel loses here
            if connection.release(kind, key).is_err() {
                continue;
            }
            let outcome = connection.send_cancel(kind, id, self.rpc_timeout).await;
            match &outcome {
                RpcOutcome::Acknowledged => {
                    info!(connection = %connection.id(), kind = %kind, history_id = %id, "worker cancelled run")
                }
                RpcOutcome::Rejected(message) => {
                    warn!(connection = %connection.id(), kind = %kind, history_id = %id, %message, "worker rejected cancel")
                }
                RpcOutcome::TimedOut => {
                    warn!(connection = %connection.id(), kind = %kind, history_id = %id, timeout = ?self.rpc_timeout, "cancel rpc timed out")
                }
                RpcOutcome::Closed => {
                    warn!(connection = %connection.id(), kind = %kind, history_id = %id, "connection closed during cancel")
                }
            }
            signals.push(CancelSignal {
                connection: connection.id().clone(),
                host: connection.host(),
                outcome,
            });
        }
        signals
    }

    /// Force the record to FAILED unless it already finished.
    async fn finalize(&self, kind: RunKind, id: &str) -> bool {
        let store = self.stores.for_kind(kind);
        let mut record = match store.find(id).await {
            Ok(record) => record,
            Err(e) => {
                error!(history_id = %id, error = %e, "failed to re-read history after cancel");
                return false;
            }
        };
        if !record.finish(RunStatus::Failed, self.clock.epoch_ms()) {
            debug!(history_id = %id, status = %record.status, "history already terminal");
            return false;
        }
        match store.update(&record).await {
            Ok(()) => true,
            Err(e) => {
                error!(history_id = %id, error = %e, "failed to write terminal status");
                false
            }
        }
    }

    async fn reset_job_status(&self, job_id: &str) {
        let mut status = match self.stores.status.find_job_status(job_id).await {
            Ok(status) => status,
            Err(HistoryError::JobStatusNotFound(_)) => {
                JobStatusRecord::new(job_id, RunStatus::Wait, None)
            }
            Err(e) => {
                error!(job_id, error = %e, "failed to read job status");
                return;
            }
        };
        status.reset_to_wait();
        if let Err(e) = self.stores.status.update_job_status(&status).await {
            error!(job_id, error = %e, "failed to reset job status");
        }
    }
}

#[cfg(test)]
#[path = "cancel_tests.rs"]
mod tests;
