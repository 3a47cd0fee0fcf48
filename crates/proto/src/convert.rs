// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversions between wire messages and core domain types.
//!
//! Proto sub-messages are optional on the wire; absent fields decode to
//! defaults rather than errors, matching snapshot replace semantics.

use flotilla_core::{
    CpuResource, DiskResource, Instance, InstanceDetail, LaunchSpec, MemoryResource, NodeState,
    ResourceSummary,
};

use crate::common;

impl From<Instance> for common::Instance {
    fn from(i: Instance) -> Self {
        Self { name: i.name, state: i.state, ipv4: i.ipv4, image: i.image }
    }
}

impl From<common::Instance> for Instance {
    fn from(i: common::Instance) -> Self {
        Self { name: i.name, state: i.state, ipv4: i.ipv4, image: i.image }
    }
}

impl From<ResourceSummary> for common::Resource {
    fn from(r: ResourceSummary) -> Self {
        Self {
            cpu: Some(common::CpuResource { total: r.cpu.total, available: r.cpu.available }),
            memory: Some(common::MemoryResource {
                total: r.memory.total,
                available: r.memory.available,
            }),
            disk: Some(common::DiskResource { total: r.disk.total, available: r.disk.available }),
        }
    }
}

impl From<common::Resource> for ResourceSummary {
    fn from(r: common::Resource) -> Self {
        let cpu = r.cpu.unwrap_or_default();
        let memory = r.memory.unwrap_or_default();
        let disk = r.disk.unwrap_or_default();
        Self {
            cpu: CpuResource { total: cpu.total, available: cpu.available },
            memory: MemoryResource { total: memory.total, available: memory.available },
            disk: DiskResource { total: disk.total, available: disk.available },
        }
    }
}

impl From<NodeState> for common::NodeState {
    fn from(s: NodeState) -> Self {
        Self {
            instances: s.instances.into_iter().map(Into::into).collect(),
            resource: Some(s.resource.into()),
        }
    }
}

impl From<common::NodeState> for NodeState {
    fn from(s: common::NodeState) -> Self {
        Self {
            instances: s.instances.into_iter().map(Into::into).collect(),
            resource: s.resource.map(Into::into).unwrap_or_default(),
        }
    }
}

impl From<InstanceDetail> for common::InstanceDetail {
    fn from(d: InstanceDetail) -> Self {
        Self {
            id: d.id,
            name: d.name,
            memory_usage: d.memory_usage,
            memory_total: d.memory_total,
            disk_usage: d.disk_usage,
            disk_total: d.disk_total,
            load: d.load,
            cpu_times: d.cpu_times,
            cpu_count: d.cpu_count,
            image_release: d.image_release,
            current_release: d.current_release,
            uptime: d.uptime,
            creation_timestamp: d.creation_timestamp,
        }
    }
}

impl From<common::InstanceDetail> for InstanceDetail {
    fn from(d: common::InstanceDetail) -> Self {
        Self {
            id: d.id,
            name: d.name,
            memory_usage: d.memory_usage,
            memory_total: d.memory_total,
            disk_usage: d.disk_usage,
            disk_total: d.disk_total,
            load: d.load,
            cpu_times: d.cpu_times,
            cpu_count: d.cpu_count,
            image_release: d.image_release,
            current_release: d.current_release,
            uptime: d.uptime,
            creation_timestamp: d.creation_timestamp,
        }
    }
}

impl From<LaunchSpec> for common::LaunchRequest {
    fn from(l: LaunchSpec) -> Self {
        Self {
            instance_name: l.instance_name,
            num_cores: l.num_cores,
            mem_size: l.mem_size,
            disk_space: l.disk_space,
        }
    }
}

impl From<common::LaunchRequest> for LaunchSpec {
    fn from(l: common::LaunchRequest) -> Self {
        Self {
            instance_name: l.instance_name,
            num_cores: l.num_cores,
            mem_size: l.mem_size,
            disk_space: l.disk_space,
        }
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
