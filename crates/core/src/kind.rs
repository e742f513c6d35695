// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution kinds.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a run was started. Selects the registry a run lives in and the
/// history store that owns its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Scheduled,
    Manual,
    Debug,
}

impl RunKind {
    pub const ALL: [RunKind; 3] = [RunKind::Scheduled, RunKind::Manual, RunKind::Debug];

    /// Debug runs live in the debug history store; the others share the job
    /// history store.
    pub fn is_debug(self) -> bool {
        matches!(self, RunKind::Debug)
    }
}

crate::simple_display! {
    RunKind {
        Scheduled => "scheduled",
        Manual => "manual",
        Debug => "debug",
    }
}

impl FromStr for RunKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scheduled" | "schedule" => Ok(RunKind::Scheduled),
            "manual" => Ok(RunKind::Manual),
            "debug" => Ok(RunKind::Debug),
            other => Err(format!("unknown run kind: {other}")),
        }
    }
}
