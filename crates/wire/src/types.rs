// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payload types shared by requests and responses.

use std::collections::BTreeMap;

use rota_core::RunKind;
use serde::{Deserialize, Serialize};

/// Operation requested by the web layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operate {
    Cancel,
    HeartbeatInfo,
}

rota_core::simple_display! {
    Operate {
        Cancel => "cancel",
        HeartbeatInfo => "heartbeat_info",
    }
}

/// Outcome of a web operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebStatus {
    Ok,
    Error,
}

/// Operation originating from the web layer, addressed to the master.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebRequest {
    pub rid: u64,
    pub operate: Operate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RunKind>,
    /// History id (debug history id for debug runs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl WebRequest {
    pub fn cancel(rid: u64, kind: RunKind, id: impl Into<String>) -> Self {
        Self { rid, operate: Operate::Cancel, kind: Some(kind), id: Some(id.into()) }
    }

    pub fn heartbeat_info(rid: u64) -> Self {
        Self { rid, operate: Operate::HeartbeatInfo, kind: None, id: None }
    }
}

/// Reply to a [`WebRequest`], echoing its rid and operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebResponse {
    pub rid: u64,
    pub operate: Operate,
    pub status: WebStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
    /// Latest heartbeat per worker host, for [`Operate::HeartbeatInfo`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub heartbeats: BTreeMap<String, HeartbeatInfo>,
}

impl WebResponse {
    pub fn ok(request: &WebRequest) -> Self {
        Self {
            rid: request.rid,
            operate: request.operate,
            status: WebStatus::Ok,
            error_text: None,
            heartbeats: BTreeMap::new(),
        }
    }

    pub fn error(request: &WebRequest, text: impl Into<String>) -> Self {
        Self { status: WebStatus::Error, error_text: Some(text.into()), ..Self::ok(request) }
    }

    pub fn with_heartbeats(mut self, heartbeats: BTreeMap<String, HeartbeatInfo>) -> Self {
        self.heartbeats = heartbeats;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == WebStatus::Ok
    }
}

/// Load sample and running-run ids a worker reports with each heartbeat.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HeartbeatInfo {
    pub host: String,
    pub cores: usize,
    /// One-minute load average divided by core count.
    pub cpu_load_per_core: f32,
    /// Used memory as a fraction of total, 0.0..=1.0.
    pub mem_rate: f32,
    /// Total memory in bytes.
    pub mem_total: u64,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub running: Vec<String>,
    #[serde(default)]
    pub manual_running: Vec<String>,
    #[serde(default)]
    pub debug_running: Vec<String>,
}

impl HeartbeatInfo {
    /// Ids reported for `kind`.
    pub fn running_for(&self, kind: RunKind) -> &[String] {
        match kind {
            RunKind::Scheduled => &self.running,
            RunKind::Manual => &self.manual_running,
            RunKind::Debug => &self.debug_running,
        }
    }
}
