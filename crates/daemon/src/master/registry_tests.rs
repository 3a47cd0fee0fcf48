// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flotilla_core::Instance;
use tonic::transport::Endpoint;

fn session(node_name: &str) -> WorkerSession {
    // connect_lazy performs no I/O; the channel is never driven in tests.
    let channel = Endpoint::from_static("http://127.0.0.1:1").connect_lazy();
    WorkerSession::new(
        SessionId::generate(),
        node_name.to_string(),
        "127.0.0.1:50061".parse().unwrap(),
        AgentClient::new(channel),
    )
}

fn snapshot_with(name: &str) -> NodeState {
    NodeState {
        instances: vec![Instance { name: name.into(), ..Default::default() }],
        ..Default::default()
    }
}

#[test]
fn insert_then_remove() {
    let registry = Registry::new();
    let s = session("w1");
    let id = s.id.clone();

    registry.insert(s);
    assert_eq!(registry.len(), 1);

    registry.remove(&id);
    assert!(registry.is_empty());
}

#[test]
fn remove_absent_is_a_no_op() {
    let registry = Registry::new();
    registry.remove(&SessionId::generate());
    assert!(registry.is_empty());
}

#[test]
fn update_state_replaces_snapshot_and_bumps_sync_time() {
    let registry = Registry::new();
    let s = session("w1");
    let id = s.id.clone();
    let t0 = s.last_sync;
    registry.insert(s);

    registry.update_state(&id, snapshot_with("alpha"));

    registry.for_each(|session| {
        assert!(session.state.has_instance("alpha"));
        assert!(session.last_sync >= t0);
        true
    });
}

#[test]
fn update_state_after_removal_is_silent() {
    let registry = Registry::new();
    let s = session("w1");
    let id = s.id.clone();
    registry.insert(s);
    registry.remove(&id);

    // Racy removal: the late snapshot is dropped without reviving the entry.
    registry.update_state(&id, snapshot_with("alpha"));
    assert!(registry.is_empty());
}

#[test]
fn for_each_short_circuits() {
    let registry = Registry::new();
    registry.insert(session("w1"));
    registry.insert(session("w2"));
    registry.insert(session("w3"));

    let mut seen = 0;
    registry.for_each(|_| {
        seen += 1;
        false
    });
    assert_eq!(seen, 1);
}

#[test]
fn reconnect_leaves_single_entry_per_worker() {
    let registry = Registry::new();

    // Same node reconnecting three times: each accept mints a fresh id and
    // the previous stream's teardown removes its entry.
    let mut last_id = None;
    for _ in 0..3 {
        if let Some(id) = last_id.take() {
            registry.remove(&id);
        }
        let s = session("w1");
        last_id = Some(s.id.clone());
        registry.insert(s);
    }

    assert_eq!(registry.len(), 1);
}
