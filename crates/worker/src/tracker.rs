// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local execution tracking.
//!
//! Every run executing on this worker is registered under its history id in
//! the registry for its kind. The flush loop periodically persists each run's
//! log so progress is visible before the run ends.
//!
//! Terminal writes go through [`rota_core::HistoryStore::update_finished`], so a status
//! the master already wrote is never replaced.

use std::sync::Arc;
use std::time::Duration;

use rota_core::{
    Clock, HistoryRecord, HistoryStores, RegistryError, RunKind, RunRegistries, RunStatus,
};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::job::{Job, SpawnedJob};

/// Log line written when a run is cancelled.
pub const CANCELLED_LOG_LINE: &str = "run cancelled";

/// Note appended to a cancelled run's illustrate field.
pub const CANCELLED_NOTE: &str = "cancelled by request";

/// Result of one flush pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub flushed: usize,
    /// History ids whose log could not be persisted.
    pub failed: Vec<String>,
}

/// A run that finished on its own, keyed the way the master registered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFinished {
    pub kind: RunKind,
    pub dispatch_key: String,
    pub history_id: String,
}

pub struct LocalExecutionTracker {
    runs: RunRegistries<Arc<dyn Job>>,
    stores: HistoryStores,
    clock: Arc<dyn Clock>,
    finished: broadcast::Sender<RunFinished>,
}

impl LocalExecutionTracker {
    pub fn new(stores: HistoryStores, clock: Arc<dyn Clock>) -> Self {
        let (finished, _) = broadcast::channel(256);
        Self { runs: RunRegistries::new(), stores, clock, finished }
    }

    /// Notices for runs that finished without being cancelled.
    pub fn subscribe(&self) -> broadcast::Receiver<RunFinished> {
        self.finished.subscribe()
    }

    /// Register a job under its history id.
    pub fn track(&self, job: Arc<dyn Job>) -> Result<(), RegistryError> {
        let kind = job.context().kind();
        let id = job.context().history_id().to_string();
        match self.runs.for_kind(kind).put(id.clone(), job) {
            Ok(()) => {
                info!(kind = %kind, history_id = %id, "tracking run");
                Ok(())
            }
            Err(e) => {
                error!(kind = %kind, history_id = %id, error = %e, "run already tracked");
                Err(e)
            }
        }
    }

    /// Track a spawned job and deregister it when its work returns.
    pub fn track_spawned(self: &Arc<Self>, job: Arc<SpawnedJob>) -> Result<(), RegistryError> {
        self.track(job.clone())?;
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            job.done().await;
            let kind = job.context().kind();
            let id = job.context().history_id().to_string();
            // a cancel already removed it and wrote the record
            if tracker.complete(kind, &id).is_none() {
                return;
            }
            let record = job.context().record();
            match tracker.stores.for_kind(kind).update_finished(&record).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(kind = %kind, history_id = %id, status = %record.status, "run finished after its history was closed")
                }
                Err(e) => {
                    error!(kind = %kind, history_id = %id, error = %e, "failed to persist finished run")
                }
            }
            let notice = RunFinished {
                kind,
                dispatch_key: record.dispatch_key().to_string(),
                history_id: id,
            };
            // nobody listens outside Worker::run
            let _ = tracker.finished.send(notice);
        });
        Ok(())
    }

    /// Deregister a run that finished on its own. Tolerates a run already
    /// removed by a concurrent cancel.
    pub fn complete(&self, kind: RunKind, id: &str) -> Option<Arc<dyn Job>> {
        match self.runs.for_kind(kind).remove(id) {
            Ok(job) => {
                debug!(kind = %kind, history_id = %id, "run completed");
                Some(job)
            }
            Err(e) => {
                debug!(error = %e, "completion for untracked run");
                None
            }
        }
    }

    pub fn get(&self, kind: RunKind, id: &str) -> Option<Arc<dyn Job>> {
        self.runs.for_kind(kind).get(id)
    }

    pub fn is_running(&self, kind: RunKind, id: &str) -> bool {
        self.runs.for_kind(kind).contains(id)
    }

    /// History ids currently running under `kind`.
    pub fn running_ids(&self, kind: RunKind) -> Vec<String> {
        self.runs.for_kind(kind).ids()
    }

    /// Stop a local run and record it as FAILED.
    ///
    /// The run is removed before it is stopped, so a second cancel for the
    /// same id fails with `NotFound` and never stops the job twice. A failure
    /// to persist the record is logged; the run is stopped either way.
    pub async fn cancel(&self, kind: RunKind, id: &str) -> Result<HistoryRecord, RegistryError> {
        let job = self.runs.for_kind(kind).remove(id)?;
        job.cancel();

        let now = self.clock.epoch_ms();
        let record = job.context().with_record(|record| {
            record.finish(RunStatus::Failed, now);
            record.log.append_system(now, CANCELLED_LOG_LINE);
            record.annotate(CANCELLED_NOTE);
            record.clone()
        });

        match self.stores.for_kind(kind).update_finished(&record).await {
            Ok(true) => {}
            Ok(false) => debug!(kind = %kind, history_id = %id, "history already closed, kept its end time"),
            Err(e) => {
                error!(kind = %kind, history_id = %id, error = %e, "failed to persist cancelled run")
            }
        }
        info!(kind = %kind, history_id = %id, job_id = %record.job_id, "run cancelled");
        Ok(record)
    }

    /// Persist the log of every tracked run once.
    pub async fn flush_once(&self) -> FlushReport {
        let mut report = FlushReport::default();
        for registry in self.runs.iter() {
            let store = self.stores.for_kind(registry.kind());
            for (id, job) in registry.snapshot() {
                let record = job.context().record();
                match store.update_log(&record).await {
                    Ok(()) => report.flushed += 1,
                    Err(e) => {
                        warn!(
                            kind = %registry.kind(),
                            history_id = %id,
                            job_id = %record.job_id,
                            log_len = record.log.content_len(),
                            error = %e,
                            "failed to flush run log"
                        );
                        report.failed.push(id);
                    }
                }
            }
        }
        report
    }

    /// Flush every `interval` until `shutdown` fires.
    pub async fn run_flush(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let report = self.flush_once().await;
            if !report.failed.is_empty() {
                debug!(flushed = report.flushed, failed = report.failed.len(), "flush pass finished with failures");
            }
        }
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
