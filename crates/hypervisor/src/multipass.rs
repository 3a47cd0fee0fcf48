// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multipass-backed [`Hypervisor`] implementation.
//!
//! The multipass daemon models every call as a bidirectional stream; we
//! drive each as a one-shot exchange: send one request, half-close, read one
//! reply. Authentication is mutual-ish TLS: we present the client
//! certificate multipass issued, and skip verifying the daemon's self-signed
//! server certificate.

use std::path::Path;

use async_trait::async_trait;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint, Identity};

use flotilla_core::{Instance, InstanceDetail, LaunchSpec};
use flotilla_proto::multipass::rpc_client::RpcClient;
use flotilla_proto::multipass::{
    detailed_info_item, instance_status, list_reply, InfoRequest, LaunchRequest, ListRequest,
    SshInfoRequest,
};

use crate::{Hypervisor, HypervisorError, SshEndpoint};

/// Client handle to one multipass daemon.
#[derive(Clone)]
pub struct MultipassClient {
    client: RpcClient<Channel>,
}

impl MultipassClient {
    /// Build a client for the daemon at `target` (host:port), presenting the
    /// client certificate and key at the given paths.
    ///
    /// The connection is established lazily on first use, so a worker can
    /// start while the daemon is still coming up.
    pub fn new(target: &str, cert_path: &Path, key_path: &Path) -> Result<Self, HypervisorError> {
        let cert = read_pem(cert_path)?;
        let key = read_pem(key_path)?;

        let tls = ClientTlsConfig::new()
            .identity(Identity::from_pem(cert, key))
            .danger_accept_invalid_certs(true);

        let channel = Endpoint::from_shared(format!("https://{target}"))?.tls_config(tls)?.connect_lazy();

        Ok(Self { client: RpcClient::new(channel) })
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, HypervisorError> {
    std::fs::read(path)
        .map_err(|source| HypervisorError::Credentials { path: path.to_path_buf(), source })
}

/// State string shown to operators, mirroring the daemon's display names.
fn status_label(status: instance_status::Status) -> &'static str {
    use instance_status::Status;
    match status {
        Status::Running => "Running",
        Status::Starting => "Starting",
        Status::Restarting => "Restarting",
        Status::Stopped => "Stopped",
        Status::Deleted => "Deleted",
        Status::DelayedShutdown => "Delayed Shutdown",
        Status::Suspending => "Suspending",
        Status::Suspended => "Suspended",
        Status::Unknown => "Unknown",
    }
}

#[async_trait]
impl Hypervisor for MultipassClient {
    async fn list(&self) -> Result<Vec<Instance>, HypervisorError> {
        let mut client = self.client.clone();
        let request = ListRequest { verbosity_level: 1, request_ipv4: true };
        let mut replies = client.list(tokio_stream::once(request)).await?.into_inner();
        let reply = replies.message().await?.ok_or(HypervisorError::EmptyReply)?;

        let Some(list_reply::ListContents::InstanceList(list)) = reply.list_contents else {
            return Ok(Vec::new());
        };

        Ok(list
            .instances
            .into_iter()
            .map(|vm| Instance {
                name: vm.name,
                state: status_label(
                    vm.instance_status.map(|s| s.status()).unwrap_or(instance_status::Status::Unknown),
                )
                .to_string(),
                ipv4: vm.ipv4,
                image: vm.current_release,
            })
            .collect())
    }

    async fn info(&self) -> Result<Vec<InstanceDetail>, HypervisorError> {
        let mut client = self.client.clone();
        let request = InfoRequest { instance_names: Vec::new() };
        let mut replies = client.info(tokio_stream::once(request)).await?.into_inner();
        let reply = replies.message().await?.ok_or(HypervisorError::EmptyReply)?;

        // Only instance-level entries carry telemetry; other detail kinds
        // (snapshots) are skipped.
        Ok(reply
            .details
            .into_iter()
            .filter_map(|detail| {
                let detailed_info_item::ExtraInfo::InstanceInfo(info) = detail.extra_info?;
                Some(InstanceDetail {
                    id: info.id,
                    name: detail.name,
                    memory_usage: info.memory_usage,
                    memory_total: detail.memory_total,
                    disk_usage: info.disk_usage,
                    disk_total: detail.disk_total,
                    load: info.load,
                    cpu_times: info.cpu_times,
                    cpu_count: detail.cpu_count,
                    image_release: info.image_release,
                    current_release: info.current_release,
                    uptime: info.uptime,
                    creation_timestamp: info.creation_timestamp,
                })
            })
            .collect())
    }

    async fn ssh_info(&self, instance_name: &str) -> Result<SshEndpoint, HypervisorError> {
        let mut client = self.client.clone();
        let request = SshInfoRequest { instance_name: vec![instance_name.to_string()] };
        let mut replies = client.ssh_info(tokio_stream::once(request)).await?.into_inner();
        let mut reply = replies.message().await?.ok_or(HypervisorError::EmptyReply)?;

        let info = reply
            .ssh_info
            .remove(instance_name)
            .ok_or_else(|| HypervisorError::InstanceNotFound(instance_name.to_string()))?;

        Ok(SshEndpoint {
            host: info.host,
            port: info.port as u16,
            username: info.username,
            private_key: info.priv_key_base64,
        })
    }

    async fn launch(&self, spec: LaunchSpec) -> Result<(), HypervisorError> {
        let mut client = self.client.clone();
        let request = LaunchRequest {
            instance_name: spec.instance_name,
            num_cores: spec.num_cores,
            mem_size: spec.mem_size,
            disk_space: spec.disk_space,
        };
        let mut replies = client.launch(tokio_stream::once(request)).await?.into_inner();
        replies.message().await?.ok_or(HypervisorError::EmptyReply)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "multipass_tests.rs"]
mod tests;
