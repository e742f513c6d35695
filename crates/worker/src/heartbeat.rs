// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker heartbeat.
//!
//! One probe per tick over the current master link. The delay before the
//! next tick grows linearly with consecutive failures:
//! `(failures + 1) * base`. With no link the tick is skipped and the failure
//! count is left alone. Crossing [`FAILURE_THRESHOLD`] is reported on the
//! event channel; tearing the link down is left to the reconnect loop.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rota_core::{Clock, RunKind};
use rota_wire::{Channel, HeartbeatInfo, Request, Response};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::load::LoadSampler;
use crate::tracker::LocalExecutionTracker;

/// Consecutive failures tolerated before the threshold event fires.
pub const FAILURE_THRESHOLD: u32 = 10;

const EVENT_CAPACITY: usize = 16;

/// Delay before the next probe after `fail_count` consecutive failures.
pub fn next_delay(fail_count: u32, base: Duration) -> Duration {
    base.saturating_mul(fail_count.saturating_add(1))
}

/// The current connection to the master.
#[derive(Debug, Clone)]
pub struct Link {
    pub host: String,
    pub channel: Channel,
}

impl Link {
    pub fn is_alive(&self) -> bool {
        !self.channel.is_closed()
    }
}

/// Where the heartbeat loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatPhase {
    /// No probe outstanding and no failures.
    Idle,
    /// A probe is in flight.
    Probing,
    /// The last `n` probes failed.
    Backoff(u32),
}

#[derive(Debug)]
struct StateInner {
    link: Option<Link>,
    fail_count: u32,
    last_success_ms: Option<u64>,
    phase: HeartbeatPhase,
}

/// Heartbeat bookkeeping shared by the loop and the connection manager.
#[derive(Debug)]
pub struct HeartbeatState {
    inner: Mutex<StateInner>,
}

impl Default for HeartbeatState {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StateInner {
                link: None,
                fail_count: 0,
                last_success_ms: None,
                phase: HeartbeatPhase::Idle,
            }),
        }
    }

    pub fn link(&self) -> Option<Link> {
        self.inner.lock().link.clone()
    }

    /// Install a fresh link; failures counted against the old one are dropped.
    pub fn set_link(&self, link: Link) {
        let mut inner = self.inner.lock();
        inner.link = Some(link);
        inner.fail_count = 0;
        inner.phase = HeartbeatPhase::Idle;
    }

    pub fn clear_link(&self) -> Option<Link> {
        self.inner.lock().link.take()
    }

    pub fn fail_count(&self) -> u32 {
        self.inner.lock().fail_count
    }

    pub fn last_success_ms(&self) -> Option<u64> {
        self.inner.lock().last_success_ms
    }

    pub fn phase(&self) -> HeartbeatPhase {
        self.inner.lock().phase
    }

    fn begin_probe(&self) {
        self.inner.lock().phase = HeartbeatPhase::Probing;
    }

    fn record_success(&self, now_ms: u64) {
        let mut inner = self.inner.lock();
        inner.fail_count = 0;
        inner.last_success_ms = Some(now_ms);
        inner.phase = HeartbeatPhase::Idle;
    }

    fn record_failure(&self) -> u32 {
        let mut inner = self.inner.lock();
        inner.fail_count = inner.fail_count.saturating_add(1);
        inner.phase = HeartbeatPhase::Backoff(inner.fail_count);
        inner.fail_count
    }
}

/// Observable heartbeat events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatEvent {
    ThresholdExceeded { host: String, failures: u32 },
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    NoLink,
    Sent,
    Failed { failures: u32, error: String },
}

pub struct HeartbeatLoop {
    state: Arc<HeartbeatState>,
    tracker: Arc<LocalExecutionTracker>,
    sampler: Arc<dyn LoadSampler>,
    clock: Arc<dyn Clock>,
    base: Duration,
    rpc_timeout: Duration,
    events: broadcast::Sender<HeartbeatEvent>,
}

impl HeartbeatLoop {
    pub fn new(
        state: Arc<HeartbeatState>,
        tracker: Arc<LocalExecutionTracker>,
        sampler: Arc<dyn LoadSampler>,
        clock: Arc<dyn Clock>,
        base: Duration,
        rpc_timeout: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { state, tracker, sampler, clock, base, rpc_timeout, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HeartbeatEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> &Arc<HeartbeatState> {
        &self.state
    }

    /// Delay before the next tick given the current failure count.
    pub fn delay(&self) -> Duration {
        next_delay(self.state.fail_count(), self.base)
    }

    /// Payload for the next probe.
    pub fn heartbeat_info(&self) -> HeartbeatInfo {
        let load = self.sampler.sample();
        HeartbeatInfo {
            host: load.host,
            cores: load.cores,
            cpu_load_per_core: load.cpu_load_per_core,
            mem_rate: load.mem_rate,
            mem_total: load.mem_total,
            timestamp_ms: self.clock.epoch_ms(),
            running: self.tracker.running_ids(RunKind::Scheduled),
            manual_running: self.tracker.running_ids(RunKind::Manual),
            debug_running: self.tracker.running_ids(RunKind::Debug),
        }
    }

    /// Send one probe.
    pub async fn tick(&self) -> TickOutcome {
        let Some(link) = self.state.link() else {
            debug!("no master link, skipping heartbeat");
            return TickOutcome::NoLink;
        };

        self.state.begin_probe();
        let request = Request::Heartbeat { info: self.heartbeat_info() };
        let error = match link.channel.call(request, self.rpc_timeout).await {
            Ok(Response::Ok) => {
                self.state.record_success(self.clock.epoch_ms());
                return TickOutcome::Sent;
            }
            Ok(Response::Error { message }) => message,
            Ok(other) => format!("unexpected response: {other:?}"),
            Err(e) => e.to_string(),
        };

        let failures = self.state.record_failure();
        if failures > FAILURE_THRESHOLD {
            warn!(host = %link.host, failures, %error, "heartbeat failing past threshold");
            if failures == FAILURE_THRESHOLD + 1 {
                let _ = self
                    .events
                    .send(HeartbeatEvent::ThresholdExceeded { host: link.host.clone(), failures });
            }
        } else {
            warn!(host = %link.host, failures, %error, next_in = ?next_delay(failures, self.base), "heartbeat failed");
        }
        TickOutcome::Failed { failures, error }
    }

    /// Tick until `shutdown` fires, backing off after failures.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        loop {
            self.tick().await;
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.delay()) => {}
            }
        }
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
