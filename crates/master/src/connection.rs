// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Master-side view of one connected worker.

use std::time::Duration;

use parking_lot::Mutex;
use rota_core::{ConnectionId, RegistryError, RunKind, RunRegistries};
use rota_wire::{Channel, HeartbeatInfo, Request, Response, RpcError};
use tracing::debug;

/// Proof that a run was dispatched over a particular connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub history_id: String,
    pub dispatched_at_ms: u64,
}

/// What came back from a cancel RPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcOutcome {
    /// Worker answered OK.
    Acknowledged,
    /// Worker answered with an error.
    Rejected(String),
    /// No answer within the timeout; not retried.
    TimedOut,
    /// The connection dropped before an answer arrived.
    Closed,
}

impl RpcOutcome {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, RpcOutcome::Acknowledged)
    }
}

rota_core::simple_display! {
    RpcOutcome {
        Acknowledged => "acknowledged",
        Rejected(..) => "rejected",
        TimedOut => "timed out",
        Closed => "closed",
    }
}

/// One persistent channel to a worker plus the runs dispatched over it.
#[derive(Debug)]
pub struct WorkerConnection {
    id: ConnectionId,
    host: String,
    channel: Channel,
    runs: RunRegistries<RunHandle>,
    heartbeat: Mutex<Option<HeartbeatInfo>>,
}

impl WorkerConnection {
    pub fn new(host: impl Into<String>, channel: Channel) -> Self {
        Self {
            id: ConnectionId::new(),
            host: host.into(),
            channel,
            runs: RunRegistries::new(),
            heartbeat: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Peer address, or the host name the worker reported once it has
    /// sent a heartbeat.
    pub fn host(&self) -> String {
        match self.heartbeat.lock().as_ref() {
            Some(info) if !info.host.is_empty() => info.host.clone(),
            _ => self.host.clone(),
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn runs(&self) -> &RunRegistries<RunHandle> {
        &self.runs
    }

    /// Whether `key` is currently dispatched here under `kind`.
    pub fn owns(&self, kind: RunKind, key: &str) -> bool {
        self.runs.for_kind(kind).contains(key)
    }

    pub(crate) fn track(
        &self,
        kind: RunKind,
        key: impl Into<String>,
        handle: RunHandle,
    ) -> Result<(), RegistryError> {
        self.runs.for_kind(kind).put(key, handle)
    }

    /// Deregister a run, e.g. as part of cancellation.
    pub fn release(&self, kind: RunKind, key: &str) -> Result<RunHandle, RegistryError> {
        self.runs.for_kind(kind).remove(key)
    }

    /// Deregister a run that finished on its own. A run already removed by a
    /// concurrent cancel is not an error.
    pub fn complete_run(&self, kind: RunKind, key: &str) -> Option<RunHandle> {
        match self.release(kind, key) {
            Ok(handle) => Some(handle),
            Err(e) => {
                debug!(connection = %self.id, error = %e, "run already released");
                None
            }
        }
    }

    /// Ask the worker to stop `id`, waiting at most `timeout`.
    pub async fn send_cancel(&self, kind: RunKind, id: &str, timeout: Duration) -> RpcOutcome {
        let request = Request::Cancel { kind, id: id.to_string() };
        match self.channel.call(request, timeout).await {
            Ok(Response::Ok) => RpcOutcome::Acknowledged,
            Ok(Response::Error { message }) => RpcOutcome::Rejected(message),
            Ok(other) => RpcOutcome::Rejected(format!("unexpected response: {other:?}")),
            Err(RpcError::Timeout(_)) => RpcOutcome::TimedOut,
            Err(RpcError::Closed) => RpcOutcome::Closed,
        }
    }

    pub fn record_heartbeat(&self, info: HeartbeatInfo) {
        *self.heartbeat.lock() = Some(info);
    }

    pub fn last_heartbeat(&self) -> Option<HeartbeatInfo> {
        self.heartbeat.lock().clone()
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
