// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker role: sampler, agent service, and the sync client.

mod agent;
mod sampler;
mod shell;
mod sync;

pub use agent::AgentService;
pub use sampler::{Sampler, SAMPLE_INTERVAL};
pub use shell::ShellSessionMap;
pub use sync::{SyncClient, SyncHandle};

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info};

use flotilla_hypervisor::Hypervisor;
use flotilla_proto::agent::agent_server::AgentServer;

/// Errors starting the worker role.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to bind agent listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// Parameters for one worker process.
pub struct WorkerConfig {
    /// Master cluster address, "host:port".
    pub master_addr: String,
    /// Name this node reports when joining.
    pub node_name: String,
    /// Host the agent service binds on; the port is always ephemeral and
    /// reported to the master through the sync attachments.
    pub agent_bind: String,
    /// Sampler cadence; [`SAMPLE_INTERVAL`] outside of tests.
    pub sample_interval: std::time::Duration,
}

/// A running worker: agent service bound, sampler ticking, sync loop live.
pub struct Worker {
    pub agent_addr: SocketAddr,
    sync: SyncHandle,
    sessions: Arc<ShellSessionMap>,
}

impl Worker {
    /// Start all worker tasks against the given hypervisor.
    pub async fn start(
        hypervisor: Arc<dyn Hypervisor>,
        config: WorkerConfig,
    ) -> Result<Self, WorkerError> {
        let (sampler, state_rx) = Sampler::new(Arc::clone(&hypervisor));
        let sampler = sampler.with_interval(config.sample_interval);
        let state = sampler.state();

        let sessions = Arc::new(ShellSessionMap::default());
        let agent = AgentService::new(hypervisor, state, Arc::clone(&sessions));

        let listener = TcpListener::bind((config.agent_bind.as_str(), 0)).await?;
        let agent_addr = listener.local_addr()?;

        tokio::spawn(sampler.run());

        tokio::spawn(async move {
            let incoming = TcpListenerStream::new(listener);
            if let Err(err) =
                Server::builder().add_service(AgentServer::new(agent)).serve_with_incoming(incoming).await
            {
                error!(%err, "agent service stopped");
            }
        });

        let sync = SyncClient::new(
            config.master_addr,
            config.node_name,
            agent_addr.port(),
            state_rx,
        );
        let handle = sync.handle();
        tokio::spawn(sync.run());

        info!(agent = %agent_addr, "worker started");
        Ok(Self { agent_addr, sync: handle, sessions })
    }

    /// Graceful stop: close the sync client (suppressing reconnection) and
    /// tear down any live shell sessions.
    pub fn close(&self) {
        self.sync.close();
        self.sessions.close_all();
    }
}
