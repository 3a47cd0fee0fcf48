// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster service: accepts worker sync streams.
//!
//! Handshake on accept: mint a session id, resolve the worker's agent
//! endpoint from the observed peer address and the reported port, open an
//! agent client back to it, reply once with the id, and register the
//! session. Every later frame is a full snapshot that replaces the cached
//! one. The stream ending (worker close, transport failure, or our own
//! shutdown) removes the session; the master never retries.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info};

use flotilla_core::{NodeState, SessionId};
use flotilla_proto::agent::agent_client::AgentClient;
use flotilla_proto::attachments;
use flotilla_proto::cluster::cluster_server::Cluster;
use flotilla_proto::cluster::{SyncReply, SyncRequest};

use super::registry::{Registry, WorkerSession};

pub struct ClusterService {
    registry: Arc<Registry>,
}

impl ClusterService {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

#[tonic::async_trait]
impl Cluster for ClusterService {
    type SyncStream = ReceiverStream<Result<SyncReply, Status>>;

    async fn sync(
        &self,
        request: Request<Streaming<SyncRequest>>,
    ) -> Result<Response<Self::SyncStream>, Status> {
        let peer = request
            .remote_addr()
            .ok_or_else(|| Status::internal("peer address unavailable"))?;

        let md = request.metadata();
        let node_name = attachments::required_str(md, attachments::NODE_NAME)?.to_string();
        let agent_port = attachments::required_u32(md, attachments::AGENT_PORT)?;
        let agent_addr = SocketAddr::new(peer.ip(), agent_port as u16);

        let id = SessionId::generate();

        let agent = AgentClient::connect(format!("http://{agent_addr}")).await.map_err(|err| {
            Status::unavailable(format!("failed to reach agent at {agent_addr}: {err}"))
        })?;

        // Exactly one reply frame: the assigned identity.
        let (tx, rx) = mpsc::channel(1);
        if tx.send(Ok(SyncReply { uuid: id.to_string() })).await.is_err() {
            return Err(Status::cancelled("sync stream closed during handshake"));
        }

        self.registry.insert(WorkerSession::new(id.clone(), node_name.clone(), agent_addr, agent));
        info!(%id, node_name, "worker joined");

        let mut inbound = request.into_inner();
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            // Look the session up by id on every update rather than holding
            // a reference here, so a racing removal never sees a stale view.
            loop {
                match inbound.message().await {
                    Ok(Some(frame)) => {
                        let state = frame.state.map(NodeState::from).unwrap_or_default();
                        registry.update_state(&id, state);
                    }
                    Ok(None) => break,
                    Err(status) => {
                        debug!(%id, %status, "sync stream error");
                        break;
                    }
                }
            }
            registry.remove(&id);
            info!(%id, "worker disconnected");
            drop(tx);
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
