// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Master role: cluster service, worker registry, and client api service.

mod api;
mod cluster;
mod registry;

pub use api::ApiService;
pub use cluster::ClusterService;
pub use registry::{Registry, WorkerSession};

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info};

use flotilla_proto::api::api_server::ApiServer;
use flotilla_proto::cluster::cluster_server::ClusterServer;

/// Errors starting the master role.
#[derive(Debug, Error)]
pub enum MasterError {
    #[error("failed to bind: {0}")]
    Bind(#[from] std::io::Error),
}

/// A running master: both services bound, registry shared between them.
pub struct Master {
    pub cluster_addr: SocketAddr,
    pub api_addr: SocketAddr,
    registry: Arc<Registry>,
}

impl Master {
    /// Bind the cluster and api listeners and start serving both.
    ///
    /// Pass port 0 to bind ephemerally; the chosen addresses are reported on
    /// the returned handle. Serving continues until the process exits.
    pub async fn start(cluster_bind: &str, api_bind: &str) -> Result<Self, MasterError> {
        let registry = Arc::new(Registry::new());

        let cluster_listener = TcpListener::bind(cluster_bind).await?;
        let cluster_addr = cluster_listener.local_addr()?;
        let api_listener = TcpListener::bind(api_bind).await?;
        let api_addr = api_listener.local_addr()?;

        let cluster = ClusterService::new(Arc::clone(&registry));
        tokio::spawn(async move {
            let incoming = TcpListenerStream::new(cluster_listener);
            if let Err(err) = Server::builder()
                .add_service(ClusterServer::new(cluster))
                .serve_with_incoming(incoming)
                .await
            {
                error!(%err, "cluster service stopped");
            }
        });

        let api = ApiService::new(Arc::clone(&registry));
        tokio::spawn(async move {
            let incoming = TcpListenerStream::new(api_listener);
            if let Err(err) =
                Server::builder().add_service(ApiServer::new(api)).serve_with_incoming(incoming).await
            {
                error!(%err, "api service stopped");
            }
        });

        info!(cluster = %cluster_addr, api = %api_addr, "master listening");
        Ok(Self { cluster_addr, api_addr, registry })
    }

    /// The worker registry, for inspection in tests.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }
}
