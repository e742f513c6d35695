//! Shared harness for rota specs.
//!
//! `Cluster` starts a master on an ephemeral port and attaches workers to it.
//! Every process shares one `FakeHistoryStore`, so specs can both seed
//! history and inspect what master and workers wrote.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub use std::sync::Arc;
pub use std::time::Duration;

pub use rota_core::{
    Clock, FakeClock, FakeHistoryStore, HistoryRecord, JobStatusRecord, RunKind, RunStatus,
    StoreCall, TriggerType,
};
pub use rota_master::{MasterCtx, RunHandle, RunQueue, WorkerConnection, WorkerEvent};
pub use rota_worker::{ClientError, FixedLoad, Worker, CANCELLED_LOG_LINE, CANCELLED_NOTE};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Upper bound for any single wait in a spec.
pub const SPEC_WAIT_MAX_MS: u64 = 5_000;

const SPEC_POLL_MS: u64 = 10;

/// Poll `check` until it holds or `max_ms` elapses.
pub async fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_MS)).await;
    }
}

/// A worker attached to a [`Cluster`].
pub struct Node {
    pub host: String,
    pub worker: Arc<Worker>,
    shutdown: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl Node {
    /// Stop the worker and wait for its loops to finish.
    pub async fn stop(self) {
        self.shutdown.cancel();
        self.task.await.unwrap();
    }
}

pub struct Cluster {
    pub store: FakeHistoryStore,
    pub clock: FakeClock,
    pub ctx: Arc<MasterCtx>,
    pub queue: Arc<dyn RunQueue>,
    pub port: u16,
    shutdown: CancellationToken,
}

impl Cluster {
    pub async fn start() -> Self {
        let store = FakeHistoryStore::new();
        let clock = FakeClock::new();
        let mut config = rota_master::Config::with_state_dir("/nonexistent".into());
        config.host = "127.0.0.1".to_string();
        config.port = 0;
        config.rpc_timeout = Duration::from_secs(2);

        let master = rota_master::startup_with(config, store.stores(), Arc::new(clock.clone()))
            .await
            .unwrap();
        let port = master.local_addr().unwrap().port();
        let ctx = Arc::clone(&master.ctx);
        let queue = Arc::clone(&master.queue);
        let shutdown = CancellationToken::new();
        tokio::spawn(master.run(shutdown.clone()));

        Self { store, clock, ctx, queue, port, shutdown }
    }

    /// Start a worker reporting as `host` and wait until the master has its
    /// first heartbeat.
    pub async fn attach(&self, host: &str) -> Node {
        let mut config = rota_worker::Config::with_state_dir("/nonexistent".into());
        config.master_host = "127.0.0.1".to_string();
        config.port = self.port;
        config.heartbeat_interval = Duration::from_millis(100);
        config.rpc_timeout = Duration::from_secs(2);
        config.web_timeout = Duration::from_secs(5);
        config.flush_interval = Duration::from_millis(100);

        let worker = Arc::new(rota_worker::startup_with(
            config,
            self.store.stores(),
            Arc::new(self.clock.clone()),
            Arc::new(FixedLoad::named(host)),
        ));
        let shutdown = self.shutdown.child_token();
        let task = {
            let worker = Arc::clone(&worker);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { worker.run(shutdown).await })
        };

        let seen = wait_for(SPEC_WAIT_MAX_MS, || self.connection(host).is_some()).await;
        assert!(seen, "master never heard from {host}");
        Node { host: host.to_string(), worker, shutdown, task }
    }

    /// Master-side connection of the worker reporting as `host`.
    pub fn connection(&self, host: &str) -> Option<Arc<WorkerConnection>> {
        self.ctx
            .workers
            .snapshot()
            .into_iter()
            .find(|c| c.last_heartbeat().is_some() && c.host() == host)
    }

    /// Store `record`, start it on `node` until cancelled, and register the
    /// dispatch on the master.
    pub fn run_on(&self, node: &Node, mut record: HistoryRecord) {
        record.mark_running();
        self.store.insert(record.clone());
        self.dispatch(node, &record).unwrap();

        node.worker
            .run_job(record, |context, _| async move {
                context.append_log("started");
                std::future::pending::<RunStatus>().await
            })
            .unwrap();
    }

    /// Register `record` as running on `node` from the master's side.
    pub fn dispatch(&self, node: &Node, record: &HistoryRecord) -> Result<(), rota_core::RegistryError> {
        let handle = RunHandle { history_id: record.id.clone(), dispatched_at_ms: self.clock.epoch_ms() };
        let connection = self.connection(&node.host).unwrap();
        self.ctx.workers.dispatch(connection.id(), record.kind, record.dispatch_key(), handle)
    }

    pub fn record(&self, id: &str) -> HistoryRecord {
        self.store.get(id).unwrap_or_else(|| panic!("no history record {id}"))
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
