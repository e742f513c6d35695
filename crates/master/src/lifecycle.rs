// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Master lifecycle: configuration and startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rota_core::{Clock, FileHistoryStore, HistoryStores, SystemClock};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cancel::CancellationCoordinator;
use crate::env;
use crate::listener::{Listener, MasterCtx};
use crate::queue::{MemoryRunQueue, RunQueue};
use crate::registry::WorkerRegistry;

/// Master configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/rota)
    pub state_dir: PathBuf,
    /// Directory for the master log file
    pub logs_path: PathBuf,
    /// Job history records
    pub jobs_path: PathBuf,
    /// Debug history records
    pub debug_path: PathBuf,
    /// Address to bind
    pub host: String,
    pub port: u16,
    /// Cancel RPC wait
    pub rpc_timeout: Duration,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::with_state_dir(env::state_dir()?))
    }

    pub fn with_state_dir(state_dir: PathBuf) -> Self {
        Self {
            logs_path: state_dir.join("logs"),
            jobs_path: state_dir.join("history").join("jobs"),
            debug_path: state_dir.join("history").join("debug"),
            state_dir,
            host: "0.0.0.0".to_string(),
            port: env::port(),
            rpc_timeout: env::rpc_timeout(),
        }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to bind {0}: {1}")]
    BindFailed(String, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A started master, ready to accept workers.
pub struct Master {
    pub config: Config,
    pub ctx: Arc<MasterCtx>,
    pub queue: Arc<dyn RunQueue>,
    listener: Listener,
}

impl Master {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) {
        self.listener.run(shutdown).await;
    }
}

/// Start the master with file-backed history stores.
pub async fn startup(config: Config) -> Result<Master, LifecycleError> {
    tokio::fs::create_dir_all(&config.jobs_path).await?;
    tokio::fs::create_dir_all(&config.debug_path).await?;

    let jobs = Arc::new(FileHistoryStore::new(&config.jobs_path));
    let stores = HistoryStores {
        jobs: jobs.clone(),
        debug: Arc::new(FileHistoryStore::new(&config.debug_path)),
        status: jobs,
    };
    startup_with(config, stores, Arc::new(SystemClock)).await
}

/// Start the master over the given stores and clock.
pub async fn startup_with(
    config: Config,
    stores: HistoryStores,
    clock: Arc<dyn Clock>,
) -> Result<Master, LifecycleError> {
    let addr = format!("{}:{}", config.host, config.port);
    let tcp = TcpListener::bind(&addr).await.map_err(|e| LifecycleError::BindFailed(addr, e))?;

    let workers = Arc::new(WorkerRegistry::new());
    let queue: Arc<dyn RunQueue> = Arc::new(MemoryRunQueue::new());
    let coordinator = Arc::new(CancellationCoordinator::new(
        Arc::clone(&workers),
        Arc::clone(&queue),
        stores,
        clock,
        config.rpc_timeout,
    ));
    let ctx = Arc::new(MasterCtx { workers, coordinator });
    let listener = Listener::new(tcp, Arc::clone(&ctx));

    info!(addr = %listener.local_addr()?, rpc_timeout = ?config.rpc_timeout, "master listening");
    Ok(Master { config, ctx, queue, listener })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
