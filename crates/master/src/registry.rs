// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Table of connected workers.
//!
//! Membership only changes on connect and disconnect. Scans work on a
//! [`snapshot`](WorkerRegistry::snapshot) so no lock is held while an RPC is
//! in flight.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rota_core::{ConnectionId, RegistryError, RunKind};
use rota_wire::HeartbeatInfo;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::connection::{RunHandle, WorkerConnection};

/// Connection lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Connected { connection: ConnectionId, host: String },
    /// The connection is gone; its runs no longer have an owner.
    ConnectionLost { connection: ConnectionId, host: String, orphaned: Vec<(RunKind, String)> },
}

const EVENT_CAPACITY: usize = 256;

pub struct WorkerRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<WorkerConnection>>>,
    // serializes the cross-connection uniqueness check in `dispatch`
    dispatch_lock: Mutex<()>,
    events: broadcast::Sender<WorkerEvent>,
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { connections: RwLock::new(HashMap::new()), dispatch_lock: Mutex::new(()), events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    pub fn register(&self, connection: Arc<WorkerConnection>) {
        let id = connection.id().clone();
        let host = connection.host();
        self.connections.write().insert(id.clone(), connection);
        info!(connection = %id, host = %host, "worker connected");
        let _ = self.events.send(WorkerEvent::Connected { connection: id, host });
    }

    /// Remove a connection and drop every run it owned.
    pub fn unregister(&self, id: &ConnectionId) -> Option<Arc<WorkerConnection>> {
        let connection = self.connections.write().remove(id)?;
        let orphaned: Vec<(RunKind, String)> =
            connection.runs().drain_all().into_iter().map(|(kind, key, _)| (kind, key)).collect();
        let host = connection.host();
        if orphaned.is_empty() {
            info!(connection = %id, host = %host, "worker disconnected");
        } else {
            warn!(connection = %id, host = %host, orphaned = orphaned.len(), "worker disconnected with runs in flight");
        }
        let _ = self.events.send(WorkerEvent::ConnectionLost {
            connection: id.clone(),
            host,
            orphaned,
        });
        Some(connection)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Arc<WorkerConnection>> {
        self.connections.read().get(id).cloned()
    }

    /// Point-in-time copy of the live connections, ordered by id.
    pub fn snapshot(&self) -> Vec<Arc<WorkerConnection>> {
        let mut connections: Vec<_> = self.connections.read().values().cloned().collect();
        connections.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));
        connections
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Record that `key` of `kind` now runs on connection `id`.
    ///
    /// Fails with `DuplicateRun` when any live connection already owns the
    /// key, and with `NotFound` when the connection is gone.
    pub fn dispatch(
        &self,
        id: &ConnectionId,
        kind: RunKind,
        key: &str,
        handle: RunHandle,
    ) -> Result<(), RegistryError> {
        let _guard = self.dispatch_lock.lock();
        let connections = self.snapshot();
        let Some(target) = connections.iter().find(|c| c.id() == id) else {
            return Err(RegistryError::NotFound { kind, id: key.to_string() });
        };
        if connections.iter().any(|c| c.owns(kind, key)) {
            let err = RegistryError::DuplicateRun { kind, id: key.to_string() };
            error!(connection = %id, error = %err, "refusing duplicate dispatch");
            return Err(err);
        }
        target.track(kind, key, handle)
    }

    /// Latest heartbeat per worker host.
    pub fn heartbeats(&self) -> BTreeMap<String, HeartbeatInfo> {
        self.snapshot()
            .into_iter()
            .filter_map(|c| c.last_heartbeat().map(|info| (c.host(), info)))
            .collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
