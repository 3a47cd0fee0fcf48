// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory hypervisor for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tonic::Status;

use flotilla_core::{Instance, InstanceDetail, LaunchSpec};

use crate::{Hypervisor, HypervisorError, SshEndpoint};

/// Scriptable [`Hypervisor`] with preset inventory and recordable launches.
#[derive(Default)]
pub struct FakeHypervisor {
    instances: Mutex<Vec<Instance>>,
    details: Mutex<Vec<InstanceDetail>>,
    ssh: Mutex<HashMap<String, SshEndpoint>>,
    launched: Mutex<Vec<LaunchSpec>>,
    fail_list: AtomicBool,
    fail_info: AtomicBool,
}

impl FakeHypervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset the inventory with named running instances.
    pub fn with_instances(names: &[&str]) -> Self {
        let fake = Self::new();
        fake.set_instances(
            names
                .iter()
                .map(|name| Instance {
                    name: (*name).to_string(),
                    state: "Running".to_string(),
                    ipv4: vec!["10.0.0.2".to_string()],
                    image: "24.04".to_string(),
                })
                .collect(),
        );
        fake
    }

    pub fn set_instances(&self, instances: Vec<Instance>) {
        *self.instances.lock() = instances;
    }

    pub fn set_details(&self, details: Vec<InstanceDetail>) {
        *self.details.lock() = details;
    }

    pub fn set_ssh_endpoint(&self, instance_name: &str, endpoint: SshEndpoint) {
        self.ssh.lock().insert(instance_name.to_string(), endpoint);
    }

    /// Make subsequent `list` calls fail, as an unreachable daemon would.
    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `info` calls fail.
    pub fn fail_info(&self, fail: bool) {
        self.fail_info.store(fail, Ordering::SeqCst);
    }

    /// Launches recorded so far.
    pub fn launched(&self) -> Vec<LaunchSpec> {
        self.launched.lock().clone()
    }
}

#[async_trait]
impl Hypervisor for FakeHypervisor {
    async fn list(&self) -> Result<Vec<Instance>, HypervisorError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Status::unavailable("fake hypervisor down").into());
        }
        Ok(self.instances.lock().clone())
    }

    async fn info(&self) -> Result<Vec<InstanceDetail>, HypervisorError> {
        if self.fail_info.load(Ordering::SeqCst) {
            return Err(Status::unavailable("fake hypervisor down").into());
        }
        Ok(self.details.lock().clone())
    }

    async fn ssh_info(&self, instance_name: &str) -> Result<SshEndpoint, HypervisorError> {
        self.ssh
            .lock()
            .get(instance_name)
            .cloned()
            .ok_or_else(|| HypervisorError::InstanceNotFound(instance_name.to_string()))
    }

    async fn launch(&self, spec: LaunchSpec) -> Result<(), HypervisorError> {
        self.launched.lock().push(spec);
        Ok(())
    }
}
