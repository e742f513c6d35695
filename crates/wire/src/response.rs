// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use crate::WebResponse;

/// Response to a [`Request`](crate::Request)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Error response
    Error { message: String },

    /// Result of a forwarded web operation
    Web { response: WebResponse },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error { message: message.into() }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok)
    }
}
