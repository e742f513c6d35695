// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rota-worker: runs jobs, reports heartbeats and stops runs the master cancels

pub mod client;
pub mod connection;
pub mod env;
pub mod handler;
pub mod heartbeat;
pub mod job;
pub mod lifecycle;
pub mod load;
pub mod tracker;

pub use client::{ClientError, WorkerClient};
pub use connection::{ConnectError, ConnectOutcome, ConnectionManager};
pub use handler::{handle_request, serve_requests};
pub use heartbeat::{
    next_delay, HeartbeatEvent, HeartbeatLoop, HeartbeatPhase, HeartbeatState, Link, TickOutcome,
    FAILURE_THRESHOLD,
};
pub use job::{Job, JobContext, SpawnedJob};
pub use lifecycle::{startup, startup_with, Config, LifecycleError, Worker};
pub use load::{LoadSample, LoadSampler, SystemLoad};
pub use tracker::{
    FlushReport, LocalExecutionTracker, RunFinished, CANCELLED_LOG_LINE, CANCELLED_NOTE,
};

#[cfg(any(test, feature = "test-support"))]
pub use job::FakeJob;
#[cfg(any(test, feature = "test-support"))]
pub use load::FixedLoad;
