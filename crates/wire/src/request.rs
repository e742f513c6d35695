// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use rota_core::RunKind;
use serde::{Deserialize, Serialize};

use crate::{HeartbeatInfo, Response, WebRequest};

/// One message on a master/worker connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum Frame {
    Request { rid: u64, request: Request },
    Response { rid: u64, response: Response },
}

/// Request sent over a master/worker connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Master → worker: stop the run `id` of `kind`.
    Cancel { kind: RunKind, id: String },

    /// Worker → master: liveness probe with a load sample.
    Heartbeat { info: HeartbeatInfo },

    /// Worker → master: forwarded web operation.
    Web { request: WebRequest },

    /// Worker → master: run `key` of `kind` finished on its own. `key` is
    /// the dispatch key the master registered it under.
    Complete { kind: RunKind, key: String },
}

impl Request {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Cancel { .. } => "cancel",
            Request::Heartbeat { .. } => "heartbeat",
            Request::Web { .. } => "web",
            Request::Complete { .. } => "complete",
        }
    }
}
