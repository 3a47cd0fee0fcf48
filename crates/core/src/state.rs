// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-contained node state snapshots.

use serde::{Deserialize, Serialize};

use crate::{Instance, ResourceSummary};

/// Everything a worker reports about its host in one sync frame.
///
/// Snapshots carry no deltas: each one fully replaces its predecessor on the
/// master, so a lost frame costs nothing beyond one sampler tick of staleness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub instances: Vec<Instance>,
    pub resource: ResourceSummary,
}

impl NodeState {
    /// Whether this snapshot's inventory contains an instance by name.
    pub fn has_instance(&self, name: &str) -> bool {
        self.instances.iter().any(|i| i.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Instance {
        Instance { name: name.into(), ..Default::default() }
    }

    #[test]
    fn has_instance_matches_exact_name() {
        let state =
            NodeState { instances: vec![named("alpha"), named("beta")], ..Default::default() };
        assert!(state.has_instance("alpha"));
        assert!(!state.has_instance("alph"));
        assert!(!state.has_instance("gamma"));
    }

    #[test]
    fn default_snapshot_is_empty() {
        let state = NodeState::default();
        assert!(state.instances.is_empty());
        assert_eq!(state.resource.cpu.total, 0);
    }
}
