// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::history::{HistoryRecord, JobStatusRecord};
use crate::store::{HistoryError, HistoryStore, HistoryStores, JobStatusStore, MemoryHistoryStore};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core types.
pub mod strategies {
    use crate::history::RunStatus;
    use crate::kind::RunKind;
    use proptest::prelude::*;

    pub fn arb_run_kind() -> impl Strategy<Value = RunKind> {
        prop_oneof![Just(RunKind::Scheduled), Just(RunKind::Manual), Just(RunKind::Debug)]
    }

    pub fn arb_run_status() -> impl Strategy<Value = RunStatus> {
        prop_oneof![
            Just(RunStatus::Wait),
            Just(RunStatus::Running),
            Just(RunStatus::Ok),
            Just(RunStatus::Failed),
        ]
    }
}

// ── Fake history store ──────────────────────────────────────────────────

/// Recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Find(String),
    Update(String),
    UpdateLog(String),
    UpdateFinished(String),
    FindJobStatus(String),
    UpdateJobStatus(String),
}

#[derive(Default)]
struct FakeStoreState {
    calls: Vec<StoreCall>,
    fail_updates: bool,
    fail_log_updates: bool,
}

/// History store backed by memory that records every call and can be told
/// to fail writes.
#[derive(Clone, Default)]
pub struct FakeHistoryStore {
    records: Arc<MemoryHistoryStore>,
    inner: Arc<Mutex<FakeStoreState>>,
}

impl FakeHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: HistoryRecord) {
        self.records.insert(record);
    }

    pub fn insert_status(&self, status: JobStatusRecord) {
        self.records.insert_status(status);
    }

    pub fn get(&self, id: &str) -> Option<HistoryRecord> {
        self.records.get(id)
    }

    pub fn get_status(&self, job_id: &str) -> Option<JobStatusRecord> {
        self.records.get_status(job_id)
    }

    /// All recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().calls.clone()
    }

    /// Make `update` fail until reset.
    pub fn set_fail_updates(&self, fail: bool) {
        self.inner.lock().fail_updates = fail;
    }

    /// Make `update_log` fail until reset.
    pub fn set_fail_log_updates(&self, fail: bool) {
        self.inner.lock().fail_log_updates = fail;
    }

    /// Stores where jobs, debug runs and job statuses all share this fake.
    pub fn stores(&self) -> HistoryStores {
        let shared = Arc::new(self.clone());
        HistoryStores { jobs: shared.clone(), debug: shared.clone(), status: shared }
    }

    fn record(&self, call: StoreCall) {
        self.inner.lock().calls.push(call);
    }
}

#[async_trait]
impl HistoryStore for FakeHistoryStore {
    async fn find(&self, id: &str) -> Result<HistoryRecord, HistoryError> {
        self.record(StoreCall::Find(id.to_string()));
        self.records.find(id).await
    }

    async fn update(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        self.record(StoreCall::Update(record.id.clone()));
        if self.inner.lock().fail_updates {
            return Err(HistoryError::Unavailable("injected update failure".into()));
        }
        self.records.update(record).await
    }

    async fn update_log(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        self.record(StoreCall::UpdateLog(record.id.clone()));
        if self.inner.lock().fail_log_updates {
            return Err(HistoryError::Unavailable("injected log failure".into()));
        }
        self.records.update_log(record).await
    }

    async fn update_finished(&self, record: &HistoryRecord) -> Result<bool, HistoryError> {
        self.record(StoreCall::UpdateFinished(record.id.clone()));
        if self.inner.lock().fail_updates {
            return Err(HistoryError::Unavailable("injected update failure".into()));
        }
        self.records.update_finished(record).await
    }
}

#[async_trait]
impl JobStatusStore for FakeHistoryStore {
    async fn find_job_status(&self, job_id: &str) -> Result<JobStatusRecord, HistoryError> {
        self.record(StoreCall::FindJobStatus(job_id.to_string()));
        self.records.find_job_status(job_id).await
    }

    async fn update_job_status(&self, status: &JobStatusRecord) -> Result<(), HistoryError> {
        self.record(StoreCall::UpdateJobStatus(status.job_id.clone()));
        self.records.update_job_status(status).await
    }
}
