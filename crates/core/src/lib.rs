// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rota-core: run tracking types shared by the rota master and workers

pub mod macros;

pub mod clock;
pub mod history;
pub mod id;
pub mod kind;
pub mod registry;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use history::{HistoryRecord, JobStatusRecord, LogBuffer, RunStatus, TriggerType};
pub use id::{short, ConnectionId};
pub use kind::RunKind;
pub use registry::{RegistryError, RunRegistries, RunRegistry};
pub use store::{
    FileHistoryStore, HistoryError, HistoryStore, HistoryStores, JobStatusStore,
    MemoryHistoryStore,
};
#[cfg(any(test, feature = "test-support"))]
pub use test_support::{FakeHistoryStore, StoreCall};
