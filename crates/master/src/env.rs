// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the master crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Default port workers connect to.
pub const DEFAULT_PORT: u16 = 9887;

/// Resolve state directory: ROTA_STATE_DIR > XDG_STATE_HOME/rota > ~/.local/state/rota
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("ROTA_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("rota"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/rota"))
}

/// TCP port the master listens on
pub fn port() -> u16 {
    std::env::var("ROTA_PORT").ok().and_then(|s| s.parse::<u16>().ok()).unwrap_or(DEFAULT_PORT)
}

/// How long a cancel RPC waits for the worker's answer
pub fn rpc_timeout() -> Duration {
    std::env::var("ROTA_RPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
