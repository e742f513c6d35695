// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rota-master binary

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rota_master::Config;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rota-master", version, about = "Run tracking and cancellation master")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (defaults to ROTA_PORT or 9887)
    #[arg(long)]
    port: Option<u16>,

    /// State directory for history files and logs
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

/// Log to `<logs_dir>/master.log`, or stderr when the directory is unusable.
fn init_logging(logs_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::fs::create_dir_all(logs_dir).is_err() {
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        return None;
    }
    let appender = tracing_appender::rolling::never(logs_dir, "master.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match args.state_dir {
        Some(dir) => Config::with_state_dir(dir),
        None => Config::load().context("failed to load configuration")?,
    };
    config.host = args.host;
    if let Some(port) = args.port {
        config.port = port;
    }

    let _log_guard = init_logging(&config.logs_path);

    let master = rota_master::startup(config).await.context("failed to start master")?;
    info!(addr = %master.local_addr()?, "rota-master ready");

    let shutdown = CancellationToken::new();
    let server = tokio::spawn(master.run(shutdown.clone()));

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutdown requested");
    shutdown.cancel();
    server.await.context("listener task failed")?;
    Ok(())
}
