// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Master/worker RPC protocol.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload. Every
//! payload is a [`Frame`]; requests carry a request id that the matching
//! response echoes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod channel;
mod request;
mod response;
mod types;
mod wire;

pub use channel::{Channel, Inbound, RpcError};
pub use request::{Frame, Request};
pub use response::Response;
pub use types::{HeartbeatInfo, Operate, WebRequest, WebResponse, WebStatus};
pub use wire::{decode, encode, read_frame, read_message, write_frame, write_message};
pub use wire::{ProtocolError, MAX_MESSAGE_SIZE};

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
