// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{HistoryError, HistoryStore, JobStatusStore};
use crate::history::{HistoryRecord, JobStatusRecord};

/// In-process history and job-status store.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: Mutex<HashMap<String, HistoryRecord>>,
    statuses: Mutex<HashMap<String, JobStatusRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a record.
    pub fn insert(&self, record: HistoryRecord) {
        self.records.lock().insert(record.id.clone(), record);
    }

    /// Seed or replace a job status.
    pub fn insert_status(&self, status: JobStatusRecord) {
        self.statuses.lock().insert(status.job_id.clone(), status);
    }

    pub fn get(&self, id: &str) -> Option<HistoryRecord> {
        self.records.lock().get(id).cloned()
    }

    pub fn get_status(&self, job_id: &str) -> Option<JobStatusRecord> {
        self.statuses.lock().get(job_id).cloned()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn find(&self, id: &str) -> Result<HistoryRecord, HistoryError> {
        self.get(id).ok_or_else(|| HistoryError::NotFound(id.to_string()))
    }

    async fn update(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        let mut records = self.records.lock();
        match records.get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(HistoryError::NotFound(record.id.clone())),
        }
    }

    async fn update_log(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        let mut records = self.records.lock();
        match records.get_mut(&record.id) {
            Some(slot) => {
                slot.log = record.log.clone();
                Ok(())
            }
            None => Err(HistoryError::NotFound(record.id.clone())),
        }
    }

    async fn update_finished(&self, record: &HistoryRecord) -> Result<bool, HistoryError> {
        let mut records = self.records.lock();
        match records.get_mut(&record.id) {
            Some(slot) => Ok(slot.absorb_finished(record)),
            None => Err(HistoryError::NotFound(record.id.clone())),
        }
    }
}

#[async_trait]
impl JobStatusStore for MemoryHistoryStore {
    async fn find_job_status(&self, job_id: &str) -> Result<JobStatusRecord, HistoryError> {
        self.get_status(job_id).ok_or_else(|| HistoryError::JobStatusNotFound(job_id.to_string()))
    }

    async fn update_job_status(&self, status: &JobStatusRecord) -> Result<(), HistoryError> {
        self.insert_status(status.clone());
        Ok(())
    }
}
