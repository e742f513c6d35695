// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bidirectional request/response channel over one connection.
//!
//! Both peers may issue requests. Outgoing requests get a fresh request id
//! and wait on a oneshot until the peer's response with the same id arrives
//! or the caller's timeout elapses. Incoming requests are handed to the owner
//! through an mpsc receiver; the owner answers with [`Channel::reply`].
//!
//! When the connection drops (or [`Channel::close`] is called) every pending
//! call fails with [`RpcError::Closed`] and the inbound receiver yields `None`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::wire::{read_frame, write_frame, ProtocolError};
use crate::{Frame, Request, Response};

/// Bound on a single frame write.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from [`Channel::call`] and [`Channel::reply`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("channel closed")]
    Closed,
}

/// A request received from the peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub rid: u64,
    pub request: Request,
}

struct Shared {
    next_rid: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Response>>>,
    outbound: mpsc::UnboundedSender<Frame>,
    closed: CancellationToken,
}

impl Shared {
    fn shutdown(&self) {
        self.closed.cancel();
        // dropping the senders wakes every waiting call with Closed
        self.pending.lock().clear();
    }
}

/// Handle to a live connection. Cheap to clone.
#[derive(Clone)]
pub struct Channel {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("closed", &self.is_closed())
            .field("pending", &self.shared.pending.lock().len())
            .finish()
    }
}

impl Channel {
    /// Start the reader and writer tasks for a connection.
    pub fn spawn<R, W>(reader: R, writer: W) -> (Channel, mpsc::UnboundedReceiver<Inbound>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            next_rid: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            outbound: outbound_tx,
            closed: CancellationToken::new(),
        });

        tokio::spawn(write_loop(writer, outbound_rx, Arc::clone(&shared)));
        tokio::spawn(read_loop(reader, inbound_tx, Arc::clone(&shared)));

        (Channel { shared }, inbound_rx)
    }

    /// Send `request` and wait up to `timeout` for the correlated response.
    ///
    /// A timed-out call is not retried; a late response is dropped.
    pub async fn call(&self, request: Request, timeout: Duration) -> Result<Response, RpcError> {
        if self.is_closed() {
            return Err(RpcError::Closed);
        }
        let rid = self.shared.next_rid.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(rid, tx);

        // closed between the check above and the insert
        if self.is_closed() {
            self.shared.pending.lock().remove(&rid);
            return Err(RpcError::Closed);
        }

        if self.shared.outbound.send(Frame::Request { rid, request }).is_err() {
            self.shared.pending.lock().remove(&rid);
            return Err(RpcError::Closed);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(RpcError::Closed),
            Err(_) => {
                self.shared.pending.lock().remove(&rid);
                Err(RpcError::Timeout(timeout))
            }
        }
    }

    /// Answer the peer's request `rid`.
    pub fn reply(&self, rid: u64, response: Response) -> Result<(), RpcError> {
        if self.is_closed() {
            return Err(RpcError::Closed);
        }
        self.shared.outbound.send(Frame::Response { rid, response }).map_err(|_| RpcError::Closed)
    }

    /// Tear the connection down. Idempotent.
    pub fn close(&self) {
        self.shared.shutdown();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    /// Resolves once the connection is closed by either side.
    pub async fn closed(&self) {
        self.shared.closed.cancelled().await;
    }

    /// Number of calls awaiting a response.
    pub fn pending_calls(&self) -> usize {
        self.shared.pending.lock().len()
    }
}

async fn write_loop<W>(mut writer: W, mut outbound: mpsc::UnboundedReceiver<Frame>, shared: Arc<Shared>)
where
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = shared.closed.cancelled() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        if let Err(e) = write_frame(&mut writer, &frame, WRITE_TIMEOUT).await {
            warn!(error = %e, "failed to write frame, closing channel");
            break;
        }
    }
    shared.shutdown();
    let _ = writer.shutdown().await;
}

async fn read_loop<R>(mut reader: R, inbound: mpsc::UnboundedSender<Inbound>, shared: Arc<Shared>)
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = shared.closed.cancelled() => break,
            frame = read_frame(&mut reader) => frame,
        };
        match frame {
            Ok(Frame::Request { rid, request }) => {
                if inbound.send(Inbound { rid, request }).is_err() {
                    debug!(rid, "inbound receiver dropped, discarding request");
                }
            }
            Ok(Frame::Response { rid, response }) => {
                let waiter = shared.pending.lock().remove(&rid);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => debug!(rid, "response for unknown or expired request"),
                }
            }
            Err(ProtocolError::ConnectionClosed) => {
                debug!("peer closed connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "failed to read frame, closing channel");
                break;
            }
        }
    }
    shared.shutdown();
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
