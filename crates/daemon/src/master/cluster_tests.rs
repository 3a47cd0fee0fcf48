// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::worker::{AgentService, ShellSessionMap};

use std::time::Duration;

use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::Code;

use flotilla_core::Instance;
use flotilla_hypervisor::FakeHypervisor;
use flotilla_proto::agent::agent_server::AgentServer;
use flotilla_proto::cluster::cluster_client::ClusterClient;
use flotilla_proto::cluster::cluster_server::ClusterServer;
use flotilla_proto::common;

async fn serve_agent() -> u16 {
    let fake = Arc::new(FakeHypervisor::new());
    let state = Arc::new(RwLock::new(NodeState::default()));
    let svc = AgentService::new(fake, state, Arc::new(ShellSessionMap::default()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        Server::builder()
            .add_service(AgentServer::new(svc))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    port
}

async fn serve_cluster(registry: Arc<Registry>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let svc = ClusterService::new(registry);
    tokio::spawn(async move {
        Server::builder()
            .add_service(ClusterServer::new(svc))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

async fn wait_for(mut probe: impl FnMut() -> bool) {
    for _ in 0..200 {
        if probe() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not reached within the wait budget");
}

#[tokio::test]
async fn sync_without_attachments_is_invalid_argument() {
    let registry = Arc::new(Registry::new());
    let target = serve_cluster(Arc::clone(&registry)).await;

    let mut client = ClusterClient::connect(target).await.unwrap();
    let outbound = tokio_stream::iter(Vec::<SyncRequest>::new());
    let err = client.sync(outbound).await.unwrap_err();

    assert_eq!(err.code(), Code::InvalidArgument);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn handshake_assigns_identity_and_registers_session() {
    let agent_port = serve_agent().await;
    let registry = Arc::new(Registry::new());
    let target = serve_cluster(Arc::clone(&registry)).await;

    let mut client = ClusterClient::connect(target).await.unwrap();
    let (tx, rx) = tokio::sync::mpsc::channel::<SyncRequest>(1);
    let mut request = Request::new(tokio_stream::wrappers::ReceiverStream::new(rx));
    attachments::insert_str(request.metadata_mut(), attachments::NODE_NAME, "w1").unwrap();
    attachments::insert_str(
        request.metadata_mut(),
        attachments::AGENT_PORT,
        &agent_port.to_string(),
    )
    .unwrap();

    let mut inbound = client.sync(request).await.unwrap().into_inner();

    // Exactly one reply frame: the assigned identity.
    let reply = inbound.message().await.unwrap().unwrap();
    assert_eq!(reply.uuid.len(), 36);

    wait_for(|| registry.len() == 1).await;
    registry.for_each(|session| {
        assert_eq!(session.id.as_str(), reply.uuid);
        assert_eq!(session.node_name, "w1");
        assert_eq!(session.agent_addr.port(), agent_port);
        true
    });

    // Each subsequent frame replaces the cached snapshot.
    let state = NodeState {
        instances: vec![Instance { name: "alpha".into(), ..Default::default() }],
        ..Default::default()
    };
    tx.send(SyncRequest { state: Some(common::NodeState::from(state)) }).await.unwrap();

    wait_for(|| {
        let mut updated = false;
        registry.for_each(|session| {
            updated = session.state.has_instance("alpha");
            true
        });
        updated
    })
    .await;

    // Ending the stream removes the session and releases the agent handle.
    drop(tx);
    drop(inbound);
    wait_for(|| registry.is_empty()).await;
}

#[tokio::test]
async fn unreachable_agent_fails_the_handshake() {
    let registry = Arc::new(Registry::new());
    let target = serve_cluster(Arc::clone(&registry)).await;

    let mut client = ClusterClient::connect(target).await.unwrap();
    let outbound = tokio_stream::iter(Vec::<SyncRequest>::new());
    let mut request = Request::new(outbound);
    attachments::insert_str(request.metadata_mut(), attachments::NODE_NAME, "w1").unwrap();
    // Port 1 refuses connections, so the back-connection cannot be opened.
    attachments::insert_str(request.metadata_mut(), attachments::AGENT_PORT, "1").unwrap();

    let err = client.sync(request).await.unwrap_err();
    assert_eq!(err.code(), Code::Unavailable);
    assert!(registry.is_empty());
}
