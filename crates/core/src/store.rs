// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History service interfaces.
//!
//! History and job-status stores are the single source of truth for run
//! status. The tracking core only talks to them through these traits.

mod file;
mod memory;

pub use file::FileHistoryStore;
pub use memory::MemoryHistoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::history::{HistoryRecord, JobStatusRecord};
use crate::kind::RunKind;

/// Errors from history persistence.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history record not found: {0}")]
    NotFound(String),

    #[error("job status not found: {0}")]
    JobStatusNotFound(String),

    #[error("invalid record id: {0:?}")]
    InvalidId(String),

    #[error("history store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Store for job histories or debug histories.
#[async_trait]
pub trait HistoryStore: Send + Sync + 'static {
    async fn find(&self, id: &str) -> Result<HistoryRecord, HistoryError>;

    /// Persist the whole record: status, end time, annotations and log.
    async fn update(&self, record: &HistoryRecord) -> Result<(), HistoryError>;

    /// Persist only the log of an existing record.
    async fn update_log(&self, record: &HistoryRecord) -> Result<(), HistoryError>;

    /// Persist a run that finished locally without replacing a terminal
    /// status already stored. Returns whether the terminal transition was
    /// applied; see [`HistoryRecord::absorb_finished`].
    async fn update_finished(&self, record: &HistoryRecord) -> Result<bool, HistoryError> {
        let mut stored = self.find(&record.id).await?;
        let applied = stored.absorb_finished(record);
        self.update(&stored).await?;
        Ok(applied)
    }
}

/// Store for the live status of logical jobs.
#[async_trait]
pub trait JobStatusStore: Send + Sync + 'static {
    async fn find_job_status(&self, job_id: &str) -> Result<JobStatusRecord, HistoryError>;

    async fn update_job_status(&self, status: &JobStatusRecord) -> Result<(), HistoryError>;
}

/// The collaborators a master or worker writes through.
#[derive(Clone)]
pub struct HistoryStores {
    pub jobs: Arc<dyn HistoryStore>,
    pub debug: Arc<dyn HistoryStore>,
    pub status: Arc<dyn JobStatusStore>,
}

impl HistoryStores {
    /// Store that owns records of `kind`.
    pub fn for_kind(&self, kind: RunKind) -> &Arc<dyn HistoryStore> {
        if kind.is_debug() {
            &self.debug
        } else {
            &self.jobs
        }
    }

    /// In-memory stores, one per concern.
    pub fn in_memory() -> Self {
        let jobs = Arc::new(MemoryHistoryStore::new());
        Self { jobs: jobs.clone(), debug: Arc::new(MemoryHistoryStore::new()), status: jobs }
    }
}

/// Reject ids that cannot be used as a storage key.
pub(crate) fn validate_id(id: &str) -> Result<(), HistoryError> {
    let bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.chars().any(|c| c == '/' || c == '\\' || c.is_control());
    if bad {
        return Err(HistoryError::InvalidId(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
