// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-file history store.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<history-id>.json
//! <root>/status/<job-id>.json
//! ```
//!
//! Writes go to a `.tmp` sibling first and are renamed into place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{validate_id, HistoryError, HistoryStore, JobStatusStore};
use crate::history::{HistoryRecord, JobStatusRecord};

#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    root: PathBuf,
}

impl FileHistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: &str) -> Result<PathBuf, HistoryError> {
        validate_id(id)?;
        Ok(self.root.join(format!("{id}.json")))
    }

    fn status_path(&self, job_id: &str) -> Result<PathBuf, HistoryError> {
        validate_id(job_id)?;
        Ok(self.root.join("status").join(format!("{job_id}.json")))
    }

    /// Create or replace a record without requiring it to exist.
    pub async fn insert(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        let path = self.record_path(&record.id)?;
        write_json(&path, record).await
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, HistoryError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), HistoryError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    tracing::trace!(path = %path.display(), bytes = bytes.len(), "history record written");
    Ok(())
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn find(&self, id: &str) -> Result<HistoryRecord, HistoryError> {
        let path = self.record_path(id)?;
        read_json(&path).await?.ok_or_else(|| HistoryError::NotFound(id.to_string()))
    }

    async fn update(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        let path = self.record_path(&record.id)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(HistoryError::NotFound(record.id.clone()));
        }
        write_json(&path, record).await
    }

    async fn update_log(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        let path = self.record_path(&record.id)?;
        let mut stored: HistoryRecord =
            read_json(&path).await?.ok_or_else(|| HistoryError::NotFound(record.id.clone()))?;
        stored.log = record.log.clone();
        write_json(&path, &stored).await
    }
}

#[async_trait]
impl JobStatusStore for FileHistoryStore {
    async fn find_job_status(&self, job_id: &str) -> Result<JobStatusRecord, HistoryError> {
        let path = self.status_path(job_id)?;
        read_json(&path).await?.ok_or_else(|| HistoryError::JobStatusNotFound(job_id.to_string()))
    }

    async fn update_job_status(&self, status: &JobStatusRecord) -> Result<(), HistoryError> {
        let path = self.status_path(&status.job_id)?;
        write_json(&path, status).await
    }
}
