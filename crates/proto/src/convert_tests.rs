// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use flotilla_core::{CpuResource, Instance, NodeState, ResourceSummary};

use crate::common;

fn sample_state() -> NodeState {
    NodeState {
        instances: vec![Instance {
            name: "alpha".into(),
            state: "Running".into(),
            ipv4: vec!["10.0.0.5".into()],
            image: "24.04".into(),
        }],
        resource: ResourceSummary {
            cpu: CpuResource { total: 8, available: 6 },
            ..Default::default()
        },
    }
}

#[test]
fn node_state_survives_the_wire() {
    let state = sample_state();
    let wire: common::NodeState = state.clone().into();
    let back: NodeState = wire.into();
    assert_eq!(back, state);
}

#[test]
fn missing_resource_decodes_to_default() {
    let wire = common::NodeState { instances: vec![], resource: None };
    let state: NodeState = wire.into();
    assert_eq!(state.resource, ResourceSummary::default());
}

#[test]
fn missing_resource_subfields_decode_to_default() {
    let wire = common::Resource {
        cpu: Some(common::CpuResource { total: 4, available: 2 }),
        memory: None,
        disk: None,
    };
    let summary: ResourceSummary = wire.into();
    assert_eq!(summary.cpu.total, 4);
    assert_eq!(summary.memory.total, 0);
    assert_eq!(summary.disk.available, 0);
}

#[test]
fn wire_resource_is_fully_populated() {
    let wire: common::Resource = sample_state().resource.into();
    assert!(wire.cpu.is_some());
    assert!(wire.memory.is_some());
    assert!(wire.disk.is_some());
}
