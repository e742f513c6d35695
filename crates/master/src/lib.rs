// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rota-master: tracks which worker runs what and cancels runs on request

pub mod cancel;
pub mod connection;
pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod queue;
pub mod registry;

#[cfg(test)]
mod test_helpers;

pub use cancel::{CancelError, CancelReport, CancelSignal, CancellationCoordinator, KindPolicy};
pub use connection::{RpcOutcome, RunHandle, WorkerConnection};
pub use lifecycle::{startup, startup_with, Config, LifecycleError, Master};
pub use listener::{serve_connection, Listener, MasterCtx};
pub use queue::{MemoryRunQueue, RunQueue};
pub use registry::{WorkerEvent, WorkerRegistry};
