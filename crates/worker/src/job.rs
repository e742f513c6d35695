// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jobs executing on this worker.
//!
//! How a job executes is up to the job. The tracker only needs a way to stop
//! it and the history record it writes into.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use rota_core::{Clock, HistoryRecord, RunKind, RunStatus};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A run executing locally.
pub trait Job: Send + Sync + 'static {
    fn context(&self) -> &JobContext;

    /// Stop execution. Idempotent and safe to call from any task.
    fn cancel(&self);
}

/// The history record a job writes into.
#[derive(Debug)]
pub struct JobContext {
    kind: RunKind,
    history_id: String,
    record: Mutex<HistoryRecord>,
}

impl JobContext {
    pub fn new(record: HistoryRecord) -> Self {
        Self { kind: record.kind, history_id: record.id.clone(), record: Mutex::new(record) }
    }

    pub fn kind(&self) -> RunKind {
        self.kind
    }

    pub fn history_id(&self) -> &str {
        &self.history_id
    }

    /// Copy of the record as it stands now.
    pub fn record(&self) -> HistoryRecord {
        self.record.lock().clone()
    }

    /// Mutate the record under its lock.
    pub fn with_record<R>(&self, f: impl FnOnce(&mut HistoryRecord) -> R) -> R {
        f(&mut self.record.lock())
    }

    pub fn append_log(&self, line: impl Into<String>) {
        self.record.lock().log.append(line);
    }
}

/// A job whose work runs as a tokio task and stops at the next await point
/// once cancelled.
pub struct SpawnedJob {
    context: Arc<JobContext>,
    cancel: CancellationToken,
    finished: CancellationToken,
}

impl SpawnedJob {
    /// Start `work` for `record`. The status the work returns becomes the
    /// record's terminal status unless the job is cancelled first.
    pub fn spawn<F, Fut>(record: HistoryRecord, clock: Arc<dyn Clock>, work: F) -> Arc<Self>
    where
        F: FnOnce(Arc<JobContext>, CancellationToken) -> Fut,
        Fut: Future<Output = RunStatus> + Send + 'static,
    {
        let context = Arc::new(JobContext::new(record));
        context.with_record(|r| r.mark_running());
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let fut = work(Arc::clone(&context), cancel.clone());

        let job = Arc::new(Self {
            context: Arc::clone(&context),
            cancel: cancel.clone(),
            finished: finished.clone(),
        });

        tokio::spawn(async move {
            let status = tokio::select! {
                _ = cancel.cancelled() => None,
                status = fut => Some(status),
            };
            match status {
                Some(status) => {
                    let now = clock.epoch_ms();
                    context.with_record(|r| r.finish(status, now));
                    debug!(history_id = %context.history_id(), %status, "job finished");
                }
                None => debug!(history_id = %context.history_id(), "job stopped by cancel"),
            }
            finished.cancel();
        });

        job
    }

    /// Resolves once the work has returned or been stopped.
    pub async fn done(&self) {
        self.finished.cancelled().await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Job for SpawnedJob {
    fn context(&self) -> &JobContext {
        &self.context
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Job that records cancel calls and never runs anything.
    pub struct FakeJob {
        context: JobContext,
        cancels: AtomicUsize,
    }

    impl FakeJob {
        pub fn new(record: HistoryRecord) -> Arc<Self> {
            Arc::new(Self { context: JobContext::new(record), cancels: AtomicUsize::new(0) })
        }

        /// A running job of `kind` with history `id` for logical job `job_id`.
        pub fn running(kind: RunKind, id: &str, job_id: &str) -> Arc<Self> {
            let mut record = HistoryRecord::new(kind, id, job_id);
            record.mark_running();
            Self::new(record)
        }

        pub fn cancel_count(&self) -> usize {
            self.cancels.load(Ordering::SeqCst)
        }
    }

    impl Job for FakeJob {
        fn context(&self) -> &JobContext {
            &self.context
        }

        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeJob;

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
