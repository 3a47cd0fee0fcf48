// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Api service: aggregate queries over the registry plus the shell proxy.
//!
//! Every query is a projection of the registry at the moment it runs:
//! whatever needs the network (agent info calls, shell streams) is copied
//! out under the read lock and awaited after release. Aggregates are
//! best-effort: a failing worker is logged and skipped, never fatal to the
//! query.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::{Code, Request, Response, Status, Streaming};
use tracing::{debug, info, warn};

use flotilla_proto::agent::agent_client::AgentClient;
use flotilla_proto::api::api_server::Api;
use flotilla_proto::api::{
    GetInfoReply, GetInstancesReply, GetInstancesRequest, GetNodesReply, GetNodesRequest, Node,
    NodeInstance, NodeInstanceDetail,
};
use flotilla_proto::attachments;
use flotilla_proto::common::{
    GetInfoRequest, LaunchReply, LaunchRequest, ShellReply, ShellRequest,
};

use super::registry::Registry;

pub struct ApiService {
    registry: Arc<Registry>,
}

impl ApiService {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

fn epoch_ms(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}

#[tonic::async_trait]
impl Api for ApiService {
    async fn instances(
        &self,
        _request: Request<GetInstancesRequest>,
    ) -> Result<Response<GetInstancesReply>, Status> {
        let mut instances = Vec::new();
        self.registry.for_each(|session| {
            for instance in &session.state.instances {
                instances.push(NodeInstance {
                    node_name: session.node_name.clone(),
                    instance: Some(instance.clone().into()),
                });
            }
            true
        });
        Ok(Response::new(GetInstancesReply { instances }))
    }

    async fn nodes(
        &self,
        _request: Request<GetNodesRequest>,
    ) -> Result<Response<GetNodesReply>, Status> {
        let mut nodes = Vec::new();
        self.registry.for_each(|session| {
            nodes.push(Node {
                name: session.node_name.clone(),
                last_sync_ms: epoch_ms(session.last_sync),
                addr: session.agent_addr.to_string(),
                resource: Some(session.state.resource.into()),
            });
            true
        });
        Ok(Response::new(GetNodesReply { nodes }))
    }

    async fn info(
        &self,
        _request: Request<GetInfoRequest>,
    ) -> Result<Response<GetInfoReply>, Status> {
        // Copy the projection out; the fan-out happens outside the lock.
        let mut agents: Vec<(String, AgentClient<Channel>)> = Vec::new();
        self.registry.for_each(|session| {
            agents.push((session.node_name.clone(), session.agent.clone()));
            true
        });

        let mut instances = Vec::new();
        for (node_name, mut agent) in agents {
            match agent.info(GetInfoRequest {}).await {
                Ok(reply) => {
                    instances.extend(reply.into_inner().instances.into_iter().map(|detail| {
                        NodeInstanceDetail { node_name: node_name.clone(), detail: Some(detail) }
                    }));
                }
                Err(status) => {
                    // Best-effort aggregate: skip the worker, keep the rest.
                    warn!(node_name, %status, "info query failed, skipping worker");
                }
            }
        }
        Ok(Response::new(GetInfoReply { instances }))
    }

    async fn launch(
        &self,
        request: Request<LaunchRequest>,
    ) -> Result<Response<LaunchReply>, Status> {
        // Placement is a placeholder: first worker in iteration order.
        let mut target = None;
        self.registry.for_each(|session| {
            target = Some((session.node_name.clone(), session.agent.clone()));
            false
        });
        let Some((node_name, mut agent)) = target else {
            return Err(Status::not_found("no workers connected"));
        };

        info!(node_name, "delegating launch");
        agent.launch(request.into_inner()).await
    }

    type ShellStream = ReceiverStream<Result<ShellReply, Status>>;

    async fn shell(
        &self,
        request: Request<Streaming<ShellRequest>>,
    ) -> Result<Response<Self::ShellStream>, Status> {
        let md = request.metadata().clone();
        let instance_name = attachments::required_str(&md, attachments::INSTANCE_NAME)?.to_string();

        // First worker whose cached inventory knows the instance wins.
        let mut target = None;
        self.registry.for_each(|session| {
            if session.state.has_instance(&instance_name) {
                target = Some((session.node_name.clone(), session.agent.clone()));
                return false;
            }
            true
        });
        let Some((node_name, mut agent)) = target else {
            return Err(Status::not_found(format!("instance not found: {instance_name}")));
        };
        info!(node_name, instance_name, "proxying shell");

        let mut inbound = request.into_inner();

        // Downstream stream to the agent, with the client's attachments
        // copied forward so the agent sees the same identity and geometry.
        let (down_tx, down_rx) = mpsc::channel::<ShellRequest>(16);
        let mut down_request = Request::new(ReceiverStream::new(down_rx));
        attachments::copy(
            &md,
            down_request.metadata_mut(),
            &[attachments::INSTANCE_NAME, attachments::WIDTH, attachments::HEIGHT],
        );
        let mut down_replies = agent.shell(down_request).await?.into_inner();

        // Upstream-to-downstream leg. Ending this task drops the sender,
        // which half-closes the agent stream.
        tokio::spawn(async move {
            loop {
                match inbound.message().await {
                    Ok(Some(frame)) => {
                        if down_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(status) if status.code() == Code::Cancelled => {
                        // Client hung up; normal end of a shell.
                        debug!("shell client cancelled");
                        break;
                    }
                    Err(status) => {
                        warn!(%status, "shell client leg failed");
                        break;
                    }
                }
            }
        });

        // Downstream-to-upstream leg. When the client side goes away the
        // send fails, this task ends, and dropping the agent reply stream
        // cancels the downstream call.
        let (up_tx, up_rx) = mpsc::channel::<Result<ShellReply, Status>>(16);
        tokio::spawn(async move {
            loop {
                match down_replies.message().await {
                    Ok(Some(reply)) => {
                        if up_tx.send(Ok(reply)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(status) => {
                        let _ = up_tx.send(Err(status)).await;
                        break;
                    }
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(up_rx)))
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
