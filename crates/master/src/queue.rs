// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pending-dispatch queue.
//!
//! Runs sit here between submission and dispatch. Entries are keyed by run
//! identifier (history id, or debug history id for debug runs).

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use rota_core::RunKind;

#[async_trait]
pub trait RunQueue: Send + Sync + 'static {
    async fn enqueue(&self, kind: RunKind, id: &str);

    /// Remove a queued run. Returns false when it is not queued.
    async fn withdraw(&self, kind: RunKind, id: &str) -> bool;

    /// Take the oldest queued run.
    async fn next(&self) -> Option<(RunKind, String)>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[derive(Debug, Default)]
pub struct MemoryRunQueue {
    entries: Mutex<VecDeque<(RunKind, String)>>,
}

impl MemoryRunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, kind: RunKind, id: &str) -> bool {
        self.entries.lock().iter().any(|(k, i)| *k == kind && i == id)
    }
}

#[async_trait]
impl RunQueue for MemoryRunQueue {
    async fn enqueue(&self, kind: RunKind, id: &str) {
        let mut entries = self.entries.lock();
        if !entries.iter().any(|(k, i)| *k == kind && i == id) {
            entries.push_back((kind, id.to_string()));
        }
    }

    async fn withdraw(&self, kind: RunKind, id: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter().position(|(k, i)| *k == kind && i == id) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    async fn next(&self) -> Option<(RunKind, String)> {
        self.entries.lock().pop_front()
    }

    async fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
