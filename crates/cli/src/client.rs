// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Api client wrapper used by every subcommand.

use anyhow::{Context, Result};
use tonic::transport::{Channel, Endpoint};
use tonic::{IntoStreamingRequest, Streaming};

use flotilla_proto::api::api_client::ApiClient as RpcClient;
use flotilla_proto::api::{
    GetInstancesRequest, GetNodesRequest, Node, NodeInstance, NodeInstanceDetail,
};
use flotilla_proto::common::{GetInfoRequest, LaunchRequest, ShellReply, ShellRequest};

pub struct ApiClient {
    inner: RpcClient<Channel>,
}

impl ApiClient {
    pub async fn connect(addr: &str) -> Result<Self> {
        let channel = Endpoint::from_shared(format!("http://{addr}"))
            .with_context(|| format!("invalid api address: {addr}"))?
            .connect()
            .await
            .with_context(|| format!("could not reach api server at {addr}"))?;
        Ok(Self { inner: RpcClient::new(channel) })
    }

    pub async fn instances(&mut self) -> Result<Vec<NodeInstance>> {
        let reply = self.inner.instances(GetInstancesRequest {}).await.context("instances query")?;
        Ok(reply.into_inner().instances)
    }

    pub async fn nodes(&mut self) -> Result<Vec<Node>> {
        let reply = self.inner.nodes(GetNodesRequest {}).await.context("nodes query")?;
        Ok(reply.into_inner().nodes)
    }

    pub async fn info(&mut self) -> Result<Vec<NodeInstanceDetail>> {
        let reply = self.inner.info(GetInfoRequest {}).await.context("info query")?;
        Ok(reply.into_inner().instances)
    }

    pub async fn launch(&mut self, request: LaunchRequest) -> Result<()> {
        self.inner.launch(request).await.context("launch request")?;
        Ok(())
    }

    /// Open the duplex shell stream; attachments must already be on the
    /// request.
    pub async fn shell(
        &mut self,
        request: impl IntoStreamingRequest<Message = ShellRequest>,
    ) -> Result<Streaming<ShellReply>, tonic::Status> {
        Ok(self.inner.shell(request).await?.into_inner())
    }
}
