// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host load sampling for heartbeats.

use parking_lot::Mutex;
use sysinfo::System;

/// One reading of host load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadSample {
    pub host: String,
    pub cores: usize,
    pub cpu_load_per_core: f32,
    pub mem_rate: f32,
    pub mem_total: u64,
}

pub trait LoadSampler: Send + Sync + 'static {
    fn sample(&self) -> LoadSample;
}

/// Samples the local machine with `sysinfo`.
pub struct SystemLoad {
    sys: Mutex<System>,
}

impl Default for SystemLoad {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemLoad {
    pub fn new() -> Self {
        Self { sys: Mutex::new(System::new()) }
    }
}

impl LoadSampler for SystemLoad {
    fn sample(&self) -> LoadSample {
        let mut sys = self.sys.lock();
        sys.refresh_memory();
        sys.refresh_cpu();

        let cores = sys.cpus().len().max(1);
        let load = System::load_average().one as f32;
        let mem_total = sys.total_memory();
        let mem_rate =
            if mem_total == 0 { 0.0 } else { sys.used_memory() as f32 / mem_total as f32 };

        LoadSample {
            host: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            cores,
            cpu_load_per_core: load / cores as f32,
            mem_rate,
            mem_total,
        }
    }
}

/// Sampler returning a fixed reading.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Default)]
pub struct FixedLoad(pub LoadSample);

#[cfg(any(test, feature = "test-support"))]
impl FixedLoad {
    pub fn named(host: &str) -> Self {
        Self(LoadSample { host: host.to_string(), cores: 4, ..LoadSample::default() })
    }
}

#[cfg(any(test, feature = "test-support"))]
impl LoadSampler for FixedLoad {
    fn sample(&self) -> LoadSample {
        self.0.clone()
    }
}
