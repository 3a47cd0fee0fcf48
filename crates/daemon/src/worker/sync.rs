// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync client: the worker's persistent stream to the master.
//!
//! A supervised loop: probe connectivity, open the stream with the node
//! name and agent port attached, forward one snapshot per sampler publish,
//! and read identity replies until the stream ends. Any end of the stream
//! while the worker is not shutting down leads back to the probe. Nothing
//! is retried beyond that; the next sampler tick replaces whatever frame
//! was lost.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};
use tracing::{info, warn};

use flotilla_core::NodeState;
use flotilla_proto::attachments;
use flotilla_proto::cluster::cluster_client::ClusterClient;
use flotilla_proto::cluster::SyncRequest;

/// Connectivity probe cadence.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(1);
/// Total budget for one connection attempt.
pub const PROBE_BUDGET: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid master address: {0}")]
    Address(tonic::transport::Error),

    #[error("could not connect to master at {addr}: {source}")]
    Unreachable {
        addr: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("sync stream failed: {0}")]
    Stream(#[from] Status),
}

/// Handle for stopping a running [`SyncClient`].
#[derive(Clone)]
pub struct SyncHandle {
    closed: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl SyncHandle {
    /// Stop syncing: closes the in-flight stream's send side and suppresses
    /// reconnection.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }
}

pub struct SyncClient {
    master_addr: String,
    node_name: String,
    agent_port: u16,
    state_rx: watch::Receiver<NodeState>,
    closed: Arc<AtomicBool>,
    cancel: CancellationToken,
    probe_interval: Duration,
    probe_budget: Duration,
}

impl SyncClient {
    pub fn new(
        master_addr: String,
        node_name: String,
        agent_port: u16,
        state_rx: watch::Receiver<NodeState>,
    ) -> Self {
        Self {
            master_addr,
            node_name,
            agent_port,
            state_rx,
            closed: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            probe_interval: PROBE_INTERVAL,
            probe_budget: PROBE_BUDGET,
        }
    }

    /// Override the probe timing (tests shrink it to milliseconds).
    pub fn with_probe(mut self, interval: Duration, budget: Duration) -> Self {
        self.probe_interval = interval;
        self.probe_budget = budget;
        self
    }

    pub fn handle(&self) -> SyncHandle {
        SyncHandle { closed: Arc::clone(&self.closed), cancel: self.cancel.clone() }
    }

    fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Supervised sync loop; returns only once closed.
    pub async fn run(self) {
        info!(master = %self.master_addr, "sync client starting");
        loop {
            let attempt = async {
                let channel = self.connect_ready().await?;
                self.sync_once(channel).await
            };
            if let Err(err) = attempt.await {
                if !self.closed() {
                    warn!(%err, "sync attempt failed");
                }
            }
            if self.closed() {
                return;
            }
            info!("reconnecting to master");
        }
    }

    /// Poll until the channel comes up, within the probe budget.
    async fn connect_ready(&self) -> Result<Channel, SyncError> {
        let endpoint = Endpoint::from_shared(format!("http://{}", self.master_addr))
            .map_err(SyncError::Address)?;
        let deadline = tokio::time::Instant::now() + self.probe_budget;
        let mut ticker = tokio::time::interval(self.probe_interval);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(SyncError::Stream(Status::cancelled("sync client closed")));
                }
                _ = ticker.tick() => {}
            }
            match endpoint.connect().await {
                Ok(channel) => return Ok(channel),
                Err(source) => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(SyncError::Unreachable {
                            addr: self.master_addr.clone(),
                            source,
                        });
                    }
                }
            }
        }
    }

    /// One stream lifetime: attach identity, forward snapshots, read replies.
    async fn sync_once(&self, channel: Channel) -> Result<(), SyncError> {
        let mut client = ClusterClient::new(channel);

        let (tx, rx) = mpsc::channel::<SyncRequest>(1);
        let mut request = Request::new(ReceiverStream::new(rx));
        attachments::insert_str(request.metadata_mut(), attachments::NODE_NAME, &self.node_name)?;
        attachments::insert_str(
            request.metadata_mut(),
            attachments::AGENT_PORT,
            &self.agent_port.to_string(),
        )?;

        let mut inbound = client.sync(request).await?.into_inner();

        // Forwarder: one frame per sampler publish. Ends on close (dropping
        // the sender closes our send side) or on a failed send, which the
        // inbound loop then observes as the stream ending.
        let mut state_rx = self.state_rx.clone();
        let cancel = self.cancel.clone();
        let forwarder = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = state_rx.borrow_and_update().clone();
                        if tx.send(SyncRequest { state: Some(state.into()) }).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let result = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break Ok(()),
                msg = inbound.message() => match msg {
                    Ok(Some(reply)) => info!(uuid = %reply.uuid, "joined cluster"),
                    Ok(None) => break Ok(()),
                    Err(status) => break Err(SyncError::Stream(status)),
                }
            }
        };
        forwarder.abort();
        result
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
