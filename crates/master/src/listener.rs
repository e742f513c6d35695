// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for worker connections.
//!
//! Every accepted socket becomes a [`WorkerConnection`] registered for as
//! long as the socket stays up. Requests from the worker are each handled in
//! their own task so a slow cancel never holds up heartbeats.

use std::net::SocketAddr;
use std::sync::Arc;

use rota_wire::{Channel, Inbound, Request, Response};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cancel::CancellationCoordinator;
use crate::connection::WorkerConnection;
use crate::registry::WorkerRegistry;

/// Shared master context for all request handlers.
pub struct MasterCtx {
    pub workers: Arc<WorkerRegistry>,
    pub coordinator: Arc<CancellationCoordinator>,
}

/// Listener task for accepting worker connections.
pub struct Listener {
    tcp: TcpListener,
    ctx: Arc<MasterCtx>,
}

impl Listener {
    pub fn new(tcp: TcpListener, ctx: Arc<MasterCtx>) -> Self {
        Self { tcp, ctx }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    /// Accept connections until `shutdown` fires, then close every live one.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.tcp.accept() => match result {
                    Ok((stream, addr)) => {
                        debug!("TCP connection from {}", addr);
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            serve_connection(reader, writer, addr.to_string(), ctx).await;
                        });
                    }
                    Err(e) => error!("TCP accept error: {}", e),
                },
            }
        }
        for connection in self.ctx.workers.snapshot() {
            connection.channel().close();
        }
        info!("listener stopped");
    }
}

/// Serve one worker until its connection drops.
///
/// Generic over reader/writer types so tests can drive it over in-memory
/// pipes.
pub async fn serve_connection<R, W>(reader: R, writer: W, peer: String, ctx: Arc<MasterCtx>)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (channel, mut inbound) = Channel::spawn(reader, writer);
    let connection = Arc::new(WorkerConnection::new(peer, channel));
    ctx.workers.register(Arc::clone(&connection));

    while let Some(Inbound { rid, request }) = inbound.recv().await {
        let ctx = Arc::clone(&ctx);
        let connection = Arc::clone(&connection);
        tokio::spawn(async move {
            let name = request.name();
            let response = handle_request(request, &connection, &ctx).await;
            if let Err(e) = connection.channel().reply(rid, response) {
                debug!(connection = %connection.id(), rid, request = name, error = %e, "reply dropped");
            }
        });
    }

    connection.channel().close();
    ctx.workers.unregister(connection.id());
}

async fn handle_request(
    request: Request,
    connection: &WorkerConnection,
    ctx: &MasterCtx,
) -> Response {
    match request {
        Request::Heartbeat { info } => {
            debug!(connection = %connection.id(), host = %info.host, load = info.cpu_load_per_core, "heartbeat");
            connection.record_heartbeat(info);
            Response::Ok
        }
        Request::Web { request } => {
            info!(connection = %connection.id(), rid = request.rid, operate = %request.operate, "web request");
            Response::Web { response: ctx.coordinator.handle_web(&request).await }
        }
        Request::Complete { kind, key } => {
            if connection.complete_run(kind, &key).is_some() {
                info!(connection = %connection.id(), kind = %kind, key = %key, "run completed on worker");
            }
            Response::Ok
        }
        Request::Cancel { kind, id } => {
            debug!(connection = %connection.id(), kind = %kind, id = %id, "worker sent a direct cancel");
            Response::error("cancel must be sent as a web request")
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
