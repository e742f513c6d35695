// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for master unit tests.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rota_core::{FakeClock, FakeHistoryStore, HistoryRecord, RunKind};
use rota_wire::{Channel, Request, Response};

use crate::cancel::CancellationCoordinator;
use crate::connection::{RunHandle, WorkerConnection};
use crate::queue::MemoryRunQueue;
use crate::registry::WorkerRegistry;

pub(crate) const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// How a fake worker answers requests.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Reply {
    Ok,
    Error(&'static str),
    Silent,
}

/// Worker end of an in-memory connection.
pub(crate) struct FakeWorker {
    pub channel: Channel,
    received: Arc<Mutex<Vec<Request>>>,
}

impl FakeWorker {
    pub fn received(&self) -> Vec<Request> {
        self.received.lock().clone()
    }
}

/// A master-side connection wired to a fake worker that answers with `reply`.
pub(crate) fn connect_fake_worker(host: &str, reply: Reply) -> (Arc<WorkerConnection>, FakeWorker) {
    let (master_io, worker_io) = tokio::io::duplex(64 * 1024);
    let (master_read, master_write) = tokio::io::split(master_io);
    let (worker_read, worker_write) = tokio::io::split(worker_io);
    let (master_channel, _master_inbound) = Channel::spawn(master_read, master_write);
    let (worker_channel, mut worker_inbound) = Channel::spawn(worker_read, worker_write);

    let received = Arc::new(Mutex::new(Vec::new()));
    let responder = worker_channel.clone();
    let log = Arc::clone(&received);
    tokio::spawn(async move {
        while let Some(inbound) = worker_inbound.recv().await {
            log.lock().push(inbound.request);
            let response = match reply {
                Reply::Ok => Response::Ok,
                Reply::Error(message) => Response::error(message),
                Reply::Silent => continue,
            };
            let _ = responder.reply(inbound.rid, response);
        }
    });

    let connection = Arc::new(WorkerConnection::new(host, master_channel));
    (connection, FakeWorker { channel: worker_channel, received })
}

pub(crate) struct Harness {
    pub workers: Arc<WorkerRegistry>,
    pub queue: Arc<MemoryRunQueue>,
    pub store: FakeHistoryStore,
    pub clock: FakeClock,
    pub coordinator: CancellationCoordinator,
}

impl Harness {
    pub fn new() -> Self {
        let workers = Arc::new(WorkerRegistry::new());
        let queue = Arc::new(MemoryRunQueue::new());
        let store = FakeHistoryStore::new();
        let clock = FakeClock::new();
        let coordinator = CancellationCoordinator::new(
            Arc::clone(&workers),
            queue.clone(),
            store.stores(),
            Arc::new(clock.clone()),
            RPC_TIMEOUT,
        );
        Self { workers, queue, store, clock, coordinator }
    }

    /// Connect and register a fake worker.
    pub fn attach(&self, host: &str, reply: Reply) -> (Arc<WorkerConnection>, FakeWorker) {
        let (connection, worker) = connect_fake_worker(host, reply);
        self.workers.register(Arc::clone(&connection));
        (connection, worker)
    }

    /// Store `record` and dispatch it to `connection` under its dispatch key.
    pub fn dispatch(&self, connection: &WorkerConnection, record: HistoryRecord) {
        let kind = record.kind;
        let key = record.dispatch_key().to_string();
        let handle = RunHandle { history_id: record.id.clone(), dispatched_at_ms: 0 };
        self.store.insert(record);
        if let Err(e) = self.workers.dispatch(connection.id(), kind, &key, handle) {
            panic!("dispatch failed: {e}");
        }
    }
}

pub(crate) fn cancel_request(kind: RunKind, id: &str) -> Request {
    Request::Cancel { kind, id: id.to_string() }
}
