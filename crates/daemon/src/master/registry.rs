// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker registry: the membership table behind every aggregate query.
//!
//! One entry per live sync stream, keyed by the session id the master
//! minted on accept. The reader/writer lock here is the only cross-task
//! shared state in the master; no I/O happens while it is held.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::SystemTime;

use parking_lot::RwLock;
use tracing::debug;

use flotilla_core::{NodeState, SessionId};
use flotilla_proto::agent::agent_client::AgentClient;
use tonic::transport::Channel;

/// Runtime record for one connected worker.
pub struct WorkerSession {
    pub id: SessionId,
    /// Name the worker reported in its sync attachments.
    pub node_name: String,
    /// Address observed from the sync transport, paired with the reported
    /// agent port. This is where the agent service answers.
    pub agent_addr: SocketAddr,
    /// Open client to this worker's agent service. Dropping the session
    /// drops the underlying channel, which tears the connection down.
    pub agent: AgentClient<Channel>,
    /// Last received snapshot; empty until the first sync frame arrives.
    pub state: NodeState,
    pub last_sync: SystemTime,
}

impl WorkerSession {
    pub fn new(
        id: SessionId,
        node_name: String,
        agent_addr: SocketAddr,
        agent: AgentClient<Channel>,
    ) -> Self {
        Self { id, node_name, agent_addr, agent, state: NodeState::default(), last_sync: SystemTime::now() }
    }
}

/// Concurrent map of live worker sessions.
#[derive(Default)]
pub struct Registry {
    sessions: RwLock<HashMap<SessionId, WorkerSession>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly accepted session.
    pub fn insert(&self, session: WorkerSession) {
        let mut sessions = self.sessions.write();
        debug!(id = %session.id, node_name = %session.node_name, "registry insert");
        sessions.insert(session.id.clone(), session);
    }

    /// Remove a session, releasing its agent handle.
    pub fn remove(&self, id: &SessionId) {
        let removed = self.sessions.write().remove(id.as_str());
        if let Some(session) = removed {
            // The agent channel closes on drop; there is no close error to
            // surface, only the fact of the teardown.
            debug!(id = %session.id, node_name = %session.node_name, "registry remove");
        }
    }

    /// Replace a session's snapshot and stamp its sync time.
    ///
    /// A no-op when the session is gone: the sync stream may race its own
    /// removal, and a snapshot for a dead session carries no information.
    pub fn update_state(&self, id: &SessionId, state: NodeState) {
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get_mut(id.as_str()) {
            session.state = state;
            session.last_sync = SystemTime::now();
        }
    }

    /// Walk sessions under the shared lock until `f` returns false.
    ///
    /// Iteration order is unspecified and may differ between calls. Callers
    /// must copy out whatever they need; holding references past the walk or
    /// doing I/O inside `f` is not possible by construction.
    pub fn for_each(&self, mut f: impl FnMut(&WorkerSession) -> bool) {
        let sessions = self.sessions.read();
        for session in sessions.values() {
            if !f(session) {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
