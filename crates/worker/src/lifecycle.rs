// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle: configuration, startup and the reconnect loop.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rota_core::{Clock, FileHistoryStore, HistoryRecord, HistoryStores, RegistryError, RunStatus, SystemClock};
use rota_wire::{Request, Response};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::WorkerClient;
use crate::connection::ConnectionManager;
use crate::env;
use crate::heartbeat::{HeartbeatEvent, HeartbeatLoop, HeartbeatState};
use crate::job::{JobContext, SpawnedJob};
use crate::load::{LoadSampler, SystemLoad};
use crate::tracker::{LocalExecutionTracker, RunFinished};

/// Worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Master to connect to
    pub master_host: String,
    pub port: u16,
    /// Heartbeat base interval, also the wait between reconnect attempts
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
    /// Heartbeat RPC wait
    pub rpc_timeout: Duration,
    /// Web gateway call wait
    pub web_timeout: Duration,
    pub flush_interval: Duration,
    /// Root state directory (e.g. ~/.local/state/rota)
    pub state_dir: PathBuf,
    /// Directory for the worker log file
    pub logs_path: PathBuf,
    /// Job history records
    pub jobs_path: PathBuf,
    /// Debug history records
    pub debug_path: PathBuf,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::with_state_dir(env::state_dir()?))
    }

    pub fn with_state_dir(state_dir: PathBuf) -> Self {
        Self {
            master_host: "127.0.0.1".to_string(),
            port: env::port(),
            heartbeat_interval: env::heartbeat_interval(),
            connect_timeout: env::connect_timeout(),
            rpc_timeout: env::rpc_timeout(),
            web_timeout: env::web_timeout(),
            flush_interval: env::flush_interval(),
            logs_path: state_dir.join("logs"),
            jobs_path: state_dir.join("history").join("jobs"),
            debug_path: state_dir.join("history").join("debug"),
            state_dir,
        }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A started worker.
pub struct Worker {
    pub config: Config,
    pub tracker: Arc<LocalExecutionTracker>,
    pub heartbeat: Arc<HeartbeatLoop>,
    pub connections: Arc<ConnectionManager>,
    pub client: WorkerClient,
    clock: Arc<dyn Clock>,
}

impl Worker {
    pub fn state(&self) -> &Arc<HeartbeatState> {
        self.heartbeat.state()
    }

    /// Start `work` for `record` and track it until it finishes or is cancelled.
    pub fn run_job<F, Fut>(&self, record: HistoryRecord, work: F) -> Result<Arc<SpawnedJob>, RegistryError>
    where
        F: FnOnce(Arc<JobContext>, CancellationToken) -> Fut,
        Fut: Future<Output = RunStatus> + Send + 'static,
    {
        let job = SpawnedJob::spawn(record, Arc::clone(&self.clock), work);
        self.tracker.track_spawned(Arc::clone(&job))?;
        Ok(job)
    }

    /// Run the heartbeat, flush, completion and reconnect loops until
    /// `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) {
        let heartbeat = tokio::spawn(Arc::clone(&self.heartbeat).run(shutdown.clone()));
        let flush = tokio::spawn(
            Arc::clone(&self.tracker).run_flush(self.config.flush_interval, shutdown.clone()),
        );
        let completions = tokio::spawn(report_finished(
            self.tracker.subscribe(),
            Arc::clone(self.state()),
            self.config.rpc_timeout,
            shutdown.clone(),
        ));

        self.reconnect_loop(&shutdown).await;

        self.connections.disconnect();
        for (name, task) in [("heartbeat", heartbeat), ("flush", flush), ("completions", completions)] {
            if let Err(e) = task.await {
                error!(task = name, error = %e, "worker task failed");
            }
        }
        info!("worker stopped");
    }

    async fn reconnect_loop(&self, shutdown: &CancellationToken) {
        let host = self.config.master_host.as_str();
        let mut events = self.heartbeat.subscribe();
        loop {
            if self.connections.link().is_none() {
                if let Err(e) = self.connections.connect(host).await {
                    warn!(error = %e, retry_in = ?self.config.heartbeat_interval, "master unreachable");
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = tokio::time::sleep(self.config.heartbeat_interval) => continue,
                    }
                }
            }
            let Some(link) = self.connections.link() else { continue };

            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = link.channel.closed() => {
                    warn!(host = %link.host, "master link lost, reconnecting");
                }
                event = events.recv() => match event {
                    Ok(HeartbeatEvent::ThresholdExceeded { host, failures }) => {
                        error!(%host, failures, "master not answering heartbeats");
                        continue;
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return,
                },
            }
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(self.config.heartbeat_interval) => {}
            }
        }
    }
}

/// Tell the master about every run that finished on its own so it can
/// release the dispatch. Notices raised while detached are dropped; the
/// master forgets a worker's runs when its connection goes.
async fn report_finished(
    mut finished: broadcast::Receiver<RunFinished>,
    state: Arc<HeartbeatState>,
    rpc_timeout: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let notice = tokio::select! {
            _ = shutdown.cancelled() => return,
            notice = finished.recv() => match notice {
                Ok(notice) => notice,
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "completion notices dropped");
                    continue;
                }
                Err(RecvError::Closed) => return,
            },
        };
        let Some(link) = state.link().filter(|l| l.is_alive()) else {
            debug!(history_id = %notice.history_id, "no master link, completion not reported");
            continue;
        };
        let request = Request::Complete { kind: notice.kind, key: notice.dispatch_key.clone() };
        match link.channel.call(request, rpc_timeout).await {
            Ok(Response::Ok) => {
                debug!(kind = %notice.kind, key = %notice.dispatch_key, "completion reported")
            }
            Ok(other) => {
                warn!(kind = %notice.kind, key = %notice.dispatch_key, response = ?other, "master refused completion")
            }
            Err(e) => {
                warn!(kind = %notice.kind, key = %notice.dispatch_key, error = %e, "failed to report completion")
            }
        }
    }
}

/// Start a worker with file-backed history stores and the host's load.
pub async fn startup(config: Config) -> Result<Worker, LifecycleError> {
    tokio::fs::create_dir_all(&config.jobs_path).await?;
    tokio::fs::create_dir_all(&config.debug_path).await?;

    let jobs = Arc::new(FileHistoryStore::new(&config.jobs_path));
    let stores = HistoryStores {
        jobs: jobs.clone(),
        debug: Arc::new(FileHistoryStore::new(&config.debug_path)),
        status: jobs,
    };
    Ok(startup_with(config, stores, Arc::new(SystemClock), Arc::new(SystemLoad::new())))
}

/// Assemble a worker over the given stores, clock and load sampler.
pub fn startup_with(
    config: Config,
    stores: HistoryStores,
    clock: Arc<dyn Clock>,
    sampler: Arc<dyn LoadSampler>,
) -> Worker {
    let state = Arc::new(HeartbeatState::new());
    let tracker = Arc::new(LocalExecutionTracker::new(stores, Arc::clone(&clock)));
    let heartbeat = Arc::new(HeartbeatLoop::new(
        Arc::clone(&state),
        Arc::clone(&tracker),
        sampler,
        Arc::clone(&clock),
        config.heartbeat_interval,
        config.rpc_timeout,
    ));
    let connections = Arc::new(ConnectionManager::new(
        config.port,
        config.connect_timeout,
        Arc::clone(&state),
        Arc::clone(&tracker),
    ));
    let client = WorkerClient::new(state, config.web_timeout);

    info!(master = %config.master_host, port = config.port, "worker configured");
    Worker { config, tracker, heartbeat, connections, client, clock }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
