// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource and inventory sampler.
//!
//! One cooperative task per worker. Every tick it asks the hypervisor for
//! the instance list, samples host CPU / memory / disk, publishes the
//! combined snapshot under the local write lock, and offers a copy on the
//! state channel. The channel keeps only the latest value, so a sync client
//! that is mid-reconnect simply picks up the newest snapshot when it
//! returns.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use sysinfo::{Disks, System};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use flotilla_core::{CpuResource, DiskResource, MemoryResource, NodeState, ResourceSummary};
use flotilla_hypervisor::Hypervisor;

/// Sampling cadence.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(10);

pub struct Sampler {
    hypervisor: Arc<dyn Hypervisor>,
    state: Arc<RwLock<NodeState>>,
    tx: watch::Sender<NodeState>,
    interval: Duration,
}

impl Sampler {
    /// Build a sampler plus the receiving end of its state channel.
    pub fn new(hypervisor: Arc<dyn Hypervisor>) -> (Self, watch::Receiver<NodeState>) {
        let (tx, rx) = watch::channel(NodeState::default());
        (
            Self {
                hypervisor,
                state: Arc::new(RwLock::new(NodeState::default())),
                tx,
                interval: SAMPLE_INTERVAL,
            },
            rx,
        )
    }

    /// Override the cadence (tests shrink it to milliseconds).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Shared handle to the last published snapshot, read by the agent
    /// service's `instances` operation.
    pub fn state(&self) -> Arc<RwLock<NodeState>> {
        Arc::clone(&self.state)
    }

    /// Run at the sampling cadence until the task is dropped.
    pub async fn run(self) {
        let mut system = System::new();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.sample_once(&mut system).await;
        }
    }

    /// One sampling pass; public so tests can drive ticks directly.
    pub async fn sample_once(&self, system: &mut System) {
        // A listing failure keeps the prior inventory: stale beats empty.
        let instances = match self.hypervisor.list().await {
            Ok(instances) => Some(instances),
            Err(err) => {
                warn!(%err, "instance listing failed, keeping prior inventory");
                None
            }
        };

        let resource = sample_resources(system);

        let snapshot = {
            let mut state = self.state.write();
            if let Some(instances) = instances {
                state.instances = instances;
            }
            state.resource = resource;
            state.clone()
        };

        // Latest-wins publish; nothing blocks past this tick.
        let _ = self.tx.send(snapshot);
    }
}

fn sample_resources(system: &mut System) -> ResourceSummary {
    system.refresh_cpu_usage();
    system.refresh_memory();

    let total_cores = system.cpus().len() as u64;
    let cpu = CpuResource::from_usage(total_cores, f64::from(system.global_cpu_usage()));

    let memory =
        MemoryResource { total: system.total_memory(), available: system.available_memory() };

    let disks = Disks::new_with_refreshed_list();
    let mounts: Vec<(&Path, u64, u64)> = disks
        .iter()
        .map(|disk| (disk.mount_point(), disk.total_space(), disk.available_space()))
        .collect();
    let disk = disk_from_mounts(&mounts);

    ResourceSummary { cpu, memory, disk }
}

/// Disk policy: the root mount alone when visible, otherwise the sum of all
/// mounts. Either branch is stable across ticks on a given host.
fn disk_from_mounts(mounts: &[(&Path, u64, u64)]) -> DiskResource {
    if let Some((_, total, available)) =
        mounts.iter().find(|(mount, _, _)| *mount == Path::new("/"))
    {
        return DiskResource { total: *total, available: *available };
    }

    let (total, available) = mounts
        .iter()
        .fold((0, 0), |(t, a), (_, total, available)| (t + total, a + available));
    DiskResource { total, available }
}

#[cfg(test)]
#[path = "sampler_tests.rs"]
mod tests;
