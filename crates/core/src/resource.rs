// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host resource summaries carried in every state snapshot.

use serde::{Deserialize, Serialize};

/// Logical CPU cores: total on the host and currently available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuResource {
    pub total: u64,
    pub available: u64,
}

impl CpuResource {
    /// Derive availability from an instantaneous utilisation percentage.
    ///
    /// `available = total - ceil(total * pct / 100)`, saturating at zero so a
    /// utilisation spike past 100% never underflows.
    pub fn from_usage(total: u64, used_pct: f64) -> Self {
        let used = (total as f64 * used_pct / 100.0).ceil() as u64;
        Self { total, available: total.saturating_sub(used) }
    }
}

/// Virtual memory in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryResource {
    pub total: u64,
    pub available: u64,
}

/// Disk space in bytes at the sampled mounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskResource {
    pub total: u64,
    pub available: u64,
}

/// Combined resource telemetry for one host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub cpu: CpuResource,
    pub memory: MemoryResource,
    pub disk: DiskResource,
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
