// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VM instance records as reported by a worker's hypervisor.

use serde::{Deserialize, Serialize};

/// One VM on one host, as last observed by the inventory sampler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    /// Hypervisor state string ("Running", "Stopped", ...).
    pub state: String,
    pub ipv4: Vec<String>,
    /// Image label the instance was launched from.
    pub image: String,
}

/// Per-instance telemetry returned by the hypervisor's info query.
///
/// Sizes and loads stay in the hypervisor's string encoding; the control
/// plane forwards them without interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDetail {
    pub id: String,
    pub name: String,
    pub memory_usage: String,
    pub memory_total: String,
    pub disk_usage: String,
    pub disk_total: String,
    pub load: String,
    pub cpu_times: String,
    pub cpu_count: String,
    pub image_release: String,
    pub current_release: String,
    pub uptime: String,
    pub creation_timestamp: String,
}

/// Parameters for launching a new instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub instance_name: String,
    pub num_cores: i32,
    /// Memory size in the hypervisor's notation, e.g. "2G".
    pub mem_size: String,
    /// Disk size in the hypervisor's notation, e.g. "10G".
    pub disk_space: String,
}
