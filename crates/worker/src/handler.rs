// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests the master sends to this worker.

use std::sync::Arc;

use rota_wire::{Channel, Inbound, Request, Response};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::tracker::LocalExecutionTracker;

/// Answer inbound requests until the link drops.
pub async fn serve_requests(
    channel: Channel,
    mut inbound: mpsc::UnboundedReceiver<Inbound>,
    tracker: Arc<LocalExecutionTracker>,
) {
    while let Some(Inbound { rid, request }) = inbound.recv().await {
        let channel = channel.clone();
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move {
            let name = request.name();
            let response = handle_request(request, &tracker).await;
            if let Err(e) = channel.reply(rid, response) {
                debug!(rid, request = name, error = %e, "reply dropped");
            }
        });
    }
    debug!("master link closed, request loop done");
}

pub async fn handle_request(request: Request, tracker: &LocalExecutionTracker) -> Response {
    match request {
        Request::Cancel { kind, id } => match tracker.cancel(kind, &id).await {
            Ok(record) => {
                info!(kind = %kind, history_id = %id, job_id = %record.job_id, "cancelled on master request");
                Response::Ok
            }
            Err(e) => {
                warn!(kind = %kind, history_id = %id, error = %e, "cancel for run not running here");
                Response::error(e.to_string())
            }
        },
        other => {
            warn!(request = other.name(), "unsupported request from master");
            Response::error(format!("worker does not handle {} requests", other.name()))
        }
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
