// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection to the master.
//!
//! At most one link is live at a time. Connecting to the host already
//! linked is a no-op; connecting elsewhere closes the old link first.

use std::sync::Arc;
use std::time::Duration;

use rota_wire::Channel;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::handler::serve_requests;
use crate::heartbeat::{HeartbeatState, Link};
use crate::tracker::LocalExecutionTracker;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("timed out connecting to {host}:{port} after {timeout:?}")]
    ConnectTimeout { host: String, port: u16, timeout: Duration },

    #[error("failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    AlreadyConnected,
    Connected,
}

pub struct ConnectionManager {
    port: u16,
    connect_timeout: Duration,
    state: Arc<HeartbeatState>,
    tracker: Arc<LocalExecutionTracker>,
    attempt: tokio::sync::Mutex<()>,
}

impl ConnectionManager {
    pub fn new(
        port: u16,
        connect_timeout: Duration,
        state: Arc<HeartbeatState>,
        tracker: Arc<LocalExecutionTracker>,
    ) -> Self {
        Self { port, connect_timeout, state, tracker, attempt: tokio::sync::Mutex::new(()) }
    }

    pub fn state(&self) -> &Arc<HeartbeatState> {
        &self.state
    }

    /// Current live link, if any.
    pub fn link(&self) -> Option<Link> {
        self.state.link().filter(Link::is_alive)
    }

    /// Link to the master at `host`.
    ///
    /// Concurrent calls are serialized, so two callers racing for the same
    /// host open one connection.
    pub async fn connect(&self, host: &str) -> Result<ConnectOutcome, ConnectError> {
        let _attempt = self.attempt.lock().await;

        if let Some(link) = self.state.link() {
            if link.host == host && link.is_alive() {
                return Ok(ConnectOutcome::AlreadyConnected);
            }
            if link.is_alive() {
                info!(old = %link.host, new = %host, "switching master");
            }
            link.channel.close();
            self.state.clear_link();
        }

        let addr = format!("{}:{}", host, self.port);
        let stream = match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                warn!(%addr, error = %source, "connect to master failed");
                return Err(ConnectError::ConnectFailed { host: host.to_string(), port: self.port, source });
            }
            Err(_) => {
                warn!(%addr, timeout = ?self.connect_timeout, "connect to master timed out");
                return Err(ConnectError::ConnectTimeout {
                    host: host.to_string(),
                    port: self.port,
                    timeout: self.connect_timeout,
                });
            }
        };
        let _ = stream.set_nodelay(true);

        let (reader, writer) = stream.into_split();
        let (channel, inbound) = Channel::spawn(reader, writer);
        tokio::spawn(serve_requests(channel.clone(), inbound, Arc::clone(&self.tracker)));
        self.state.set_link(Link { host: host.to_string(), channel });

        info!(%addr, "connected to master");
        Ok(ConnectOutcome::Connected)
    }

    /// Close the current link.
    pub fn disconnect(&self) {
        if let Some(link) = self.state.clear_link() {
            link.channel.close();
            info!(host = %link.host, "disconnected from master");
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
