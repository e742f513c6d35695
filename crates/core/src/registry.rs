// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run registries.
//!
//! A [`RunRegistry`] maps a run identifier to whatever proves ownership of
//! that run on one side of a connection: the master keeps a `RunHandle` per
//! dispatched run, the worker keeps the live job. Every registry is shared
//! between RPC handlers, timers and execution tasks, so all access goes
//! through a short-lived lock and sweeps work on a [`snapshot`].
//!
//! [`snapshot`]: RunRegistry::snapshot

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

use crate::kind::RunKind;

/// Errors from registry mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The run is already owned here; dispatch registered it twice.
    #[error("{kind} run {id} is already registered")]
    DuplicateRun { kind: RunKind, id: String },

    /// The run is not (or no longer) owned here.
    #[error("{kind} run {id} is not registered")]
    NotFound { kind: RunKind, id: String },
}

/// Thread-safe run-id → handle map for a single [`RunKind`].
#[derive(Debug)]
pub struct RunRegistry<V> {
    kind: RunKind,
    entries: Mutex<HashMap<String, V>>,
}

impl<V: Clone> RunRegistry<V> {
    pub fn new(kind: RunKind) -> Self {
        Self { kind, entries: Mutex::new(HashMap::new()) }
    }

    pub fn kind(&self) -> RunKind {
        self.kind
    }

    /// Register ownership of `id`.
    pub fn put(&self, id: impl Into<String>, handle: V) -> Result<(), RegistryError> {
        let id = id.into();
        let mut entries = self.entries.lock();
        if entries.contains_key(&id) {
            return Err(RegistryError::DuplicateRun { kind: self.kind, id });
        }
        entries.insert(id, handle);
        Ok(())
    }

    /// Deregister `id`, returning its handle.
    pub fn remove(&self, id: &str) -> Result<V, RegistryError> {
        self.entries
            .lock()
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound { kind: self.kind, id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<V> {
        self.entries.lock().get(id).cloned()
    }

    /// Point-in-time copy of every entry, sorted by id.
    pub fn snapshot(&self) -> Vec<(String, V)> {
        let mut entries: Vec<(String, V)> =
            self.entries.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Sorted ids currently registered.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Remove and return every entry.
    pub fn drain(&self) -> Vec<(String, V)> {
        let mut entries: Vec<(String, V)> = self.entries.lock().drain().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// One registry per [`RunKind`].
#[derive(Debug)]
pub struct RunRegistries<V> {
    scheduled: RunRegistry<V>,
    manual: RunRegistry<V>,
    debug: RunRegistry<V>,
}

impl<V: Clone> Default for RunRegistries<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> RunRegistries<V> {
    pub fn new() -> Self {
        Self {
            scheduled: RunRegistry::new(RunKind::Scheduled),
            manual: RunRegistry::new(RunKind::Manual),
            debug: RunRegistry::new(RunKind::Debug),
        }
    }

    pub fn for_kind(&self, kind: RunKind) -> &RunRegistry<V> {
        match kind {
            RunKind::Scheduled => &self.scheduled,
            RunKind::Manual => &self.manual,
            RunKind::Debug => &self.debug,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunRegistry<V>> {
        [&self.scheduled, &self.manual, &self.debug].into_iter()
    }

    /// Empty every registry, returning what each held.
    pub fn drain_all(&self) -> Vec<(RunKind, String, V)> {
        self.iter()
            .flat_map(|registry| {
                let kind = registry.kind();
                registry.drain().into_iter().map(move |(id, v)| (kind, id, v))
            })
            .collect()
    }

    pub fn total(&self) -> usize {
        self.iter().map(RunRegistry::len).sum()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
