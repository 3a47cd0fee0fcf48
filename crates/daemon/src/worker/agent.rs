// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent service: the worker-local api the master calls back into.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

use flotilla_core::NodeState;
use flotilla_hypervisor::{Hypervisor, HypervisorError};
use flotilla_proto::agent::agent_server::Agent;
use flotilla_proto::agent::{GetInstancesReply, GetInstancesRequest};
use flotilla_proto::attachments;
use flotilla_proto::common::{
    GetInfoReply, GetInfoRequest, LaunchReply, LaunchRequest, ShellReply, ShellRequest,
};

use super::shell::{self, ShellSessionMap, WindowSize};

pub struct AgentService {
    hypervisor: Arc<dyn Hypervisor>,
    state: Arc<RwLock<NodeState>>,
    sessions: Arc<ShellSessionMap>,
}

impl AgentService {
    pub fn new(
        hypervisor: Arc<dyn Hypervisor>,
        state: Arc<RwLock<NodeState>>,
        sessions: Arc<ShellSessionMap>,
    ) -> Self {
        Self { hypervisor, state, sessions }
    }
}

fn status_from(err: HypervisorError) -> Status {
    match err {
        HypervisorError::InstanceNotFound(name) => {
            Status::not_found(format!("instance not found: {name}"))
        }
        HypervisorError::Rpc(status) => status,
        other => Status::unavailable(other.to_string()),
    }
}

#[tonic::async_trait]
impl Agent for AgentService {
    /// Cached inventory from the sampler; never a synchronous hypervisor
    /// call.
    async fn instances(
        &self,
        _request: Request<GetInstancesRequest>,
    ) -> Result<Response<GetInstancesReply>, Status> {
        let instances = self.state.read().instances.clone();
        Ok(Response::new(GetInstancesReply {
            instances: instances.into_iter().map(Into::into).collect(),
        }))
    }

    async fn info(
        &self,
        _request: Request<GetInfoRequest>,
    ) -> Result<Response<GetInfoReply>, Status> {
        let details = self.hypervisor.info().await.map_err(status_from)?;
        Ok(Response::new(GetInfoReply {
            instances: details.into_iter().map(Into::into).collect(),
        }))
    }

    async fn launch(
        &self,
        request: Request<LaunchRequest>,
    ) -> Result<Response<LaunchReply>, Status> {
        self.hypervisor.launch(request.into_inner().into()).await.map_err(status_from)?;
        Ok(Response::new(LaunchReply {}))
    }

    type ShellStream = ReceiverStream<Result<ShellReply, Status>>;

    async fn shell(
        &self,
        request: Request<Streaming<ShellRequest>>,
    ) -> Result<Response<Self::ShellStream>, Status> {
        let md = request.metadata();
        let instance_name = attachments::required_str(md, attachments::INSTANCE_NAME)?.to_string();
        let size = WindowSize {
            width: attachments::required_u32(md, attachments::WIDTH)?,
            height: attachments::required_u32(md, attachments::HEIGHT)?,
        };

        let endpoint = self.hypervisor.ssh_info(&instance_name).await.map_err(status_from)?;

        let inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(16);
        let sessions = Arc::clone(&self.sessions);
        tokio::spawn(shell::run(endpoint, inbound, tx, size, sessions));

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
