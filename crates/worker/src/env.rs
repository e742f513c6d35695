// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the worker crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Default master port.
pub const DEFAULT_PORT: u16 = 9887;

fn millis(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

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

/// Master port to connect to
pub fn port() -> u16 {
    std::env::var("ROTA_PORT").ok().and_then(|s| s.parse::<u16>().ok()).unwrap_or(DEFAULT_PORT)
}

/// Heartbeat base interval (default 5s)
pub fn heartbeat_interval() -> Duration {
    std::env::var("ROTA_HEARTBEAT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(5))
}

/// Wait for a heartbeat answer (default 10s)
pub fn rpc_timeout() -> Duration {
    millis("ROTA_RPC_TIMEOUT_MS").unwrap_or(Duration::from_secs(10))
}

/// Bound on establishing the master connection (default 10s)
pub fn connect_timeout() -> Duration {
    millis("ROTA_CONNECT_TIMEOUT_MS").unwrap_or(Duration::from_secs(10))
}

/// Wait for a forwarded web operation; covers a full master scan (default 60s)
pub fn web_timeout() -> Duration {
    millis("ROTA_WEB_TIMEOUT_MS").unwrap_or(Duration::from_secs(60))
}

/// Log flush period (default 5s)
pub fn flush_interval() -> Duration {
    millis("ROTA_FLUSH_INTERVAL_MS").filter(|d| !d.is_zero()).unwrap_or(Duration::from_secs(5))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
