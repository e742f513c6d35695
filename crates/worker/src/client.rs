// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Web-facing calls a worker forwards to the master over its link.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rota_core::RunKind;
use rota_wire::{HeartbeatInfo, Request, Response, RpcError, WebRequest, WebResponse, WebStatus};
use thiserror::Error;
use tracing::{debug, warn};

use crate::heartbeat::HeartbeatState;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not connected to a master")]
    NotConnected,

    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The master answered with an error; the text is shown as is.
    #[error("{0}")]
    Rejected(String),

    #[error("unexpected response from master: {0}")]
    Unexpected(String),
}

pub struct WorkerClient {
    state: Arc<HeartbeatState>,
    web_timeout: Duration,
    next_rid: AtomicU64,
}

impl WorkerClient {
    pub fn new(state: Arc<HeartbeatState>, web_timeout: Duration) -> Self {
        Self { state, web_timeout, next_rid: AtomicU64::new(1) }
    }

    /// Ask the master to cancel a run. Returns a message for the caller.
    pub async fn cancel_job_from_web(&self, kind: RunKind, id: &str) -> Result<String, ClientError> {
        let request = WebRequest::cancel(self.rid(), kind, id);
        self.send(request).await?;
        Ok(format!("cancelled {kind} run {id}"))
    }

    /// Latest heartbeat of every connected worker, keyed by host.
    pub async fn job_queue_info_from_web(&self) -> Result<BTreeMap<String, HeartbeatInfo>, ClientError> {
        let request = WebRequest::heartbeat_info(self.rid());
        let response = self.send(request).await?;
        Ok(response.heartbeats)
    }

    fn rid(&self) -> u64 {
        self.next_rid.fetch_add(1, Ordering::Relaxed)
    }

    async fn send(&self, request: WebRequest) -> Result<WebResponse, ClientError> {
        let link = self.state.link().filter(|l| l.is_alive()).ok_or(ClientError::NotConnected)?;
        let rid = request.rid;
        let operate = request.operate;
        debug!(rid, %operate, master = %link.host, "forwarding web request");

        let response = link.channel.call(Request::Web { request }, self.web_timeout).await?;
        let web = match response {
            Response::Web { response } => response,
            Response::Error { message } => return Err(ClientError::Rejected(message)),
            other => return Err(ClientError::Unexpected(format!("{other:?}"))),
        };
        if web.rid != rid || web.operate != operate {
            warn!(rid, got = web.rid, "web response does not match request");
            return Err(ClientError::Unexpected(format!(
                "response {} ({}) for request {} ({})",
                web.rid, web.operate, rid, operate
            )));
        }
        match web.status {
            WebStatus::Ok => Ok(web),
            WebStatus::Error => Err(ClientError::Rejected(web.error_text.unwrap_or_default())),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
