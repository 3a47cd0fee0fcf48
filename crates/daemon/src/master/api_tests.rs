// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::master::WorkerSession;
use crate::worker::{AgentService, ShellSessionMap};

use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Endpoint, Server};

use flotilla_core::{Instance, InstanceDetail, NodeState, SessionId};
use flotilla_hypervisor::FakeHypervisor;
use flotilla_proto::agent::agent_server::AgentServer;
use flotilla_proto::api::api_server::ApiServer;
use flotilla_proto::api::api_client::ApiClient;

fn offline_session(node_name: &str, instances: &[&str]) -> WorkerSession {
    let channel = Endpoint::from_static("http://127.0.0.1:1").connect_lazy();
    let mut session = WorkerSession::new(
        SessionId::generate(),
        node_name.to_string(),
        "127.0.0.1:50061".parse().unwrap(),
        AgentClient::new(channel),
    );
    session.state = NodeState {
        instances: instances
            .iter()
            .map(|name| Instance { name: (*name).to_string(), ..Default::default() })
            .collect(),
        ..Default::default()
    };
    session
}

/// A session whose agent client points at a live in-process agent service.
async fn live_session(node_name: &str, fake: Arc<FakeHypervisor>) -> WorkerSession {
    let state = Arc::new(RwLock::new(NodeState::default()));
    let svc = AgentService::new(fake, state, Arc::new(ShellSessionMap::default()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        Server::builder()
            .add_service(AgentServer::new(svc))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    let agent = AgentClient::connect(format!("http://{addr}")).await.unwrap();
    WorkerSession::new(SessionId::generate(), node_name.to_string(), addr, agent)
}

#[tokio::test]
async fn instances_aggregates_every_session() {
    let registry = Arc::new(Registry::new());
    registry.insert(offline_session("w1", &["alpha", "beta"]));
    registry.insert(offline_session("w2", &["gamma"]));
    let api = ApiService::new(Arc::clone(&registry));

    let reply = api.instances(Request::new(GetInstancesRequest {})).await.unwrap().into_inner();

    let mut pairs: Vec<(String, String)> = reply
        .instances
        .into_iter()
        .map(|ni| (ni.node_name, ni.instance.unwrap_or_default().name))
        .collect();
    pairs.sort();
    assert_eq!(
        pairs,
        [
            ("w1".to_string(), "alpha".to_string()),
            ("w1".to_string(), "beta".to_string()),
            ("w2".to_string(), "gamma".to_string()),
        ]
    );
}

#[tokio::test]
async fn nodes_projects_session_records() {
    let registry = Arc::new(Registry::new());
    registry.insert(offline_session("w1", &[]));
    let api = ApiService::new(Arc::clone(&registry));

    let reply = api.nodes(Request::new(GetNodesRequest {})).await.unwrap().into_inner();

    assert_eq!(reply.nodes.len(), 1);
    let node = &reply.nodes[0];
    assert_eq!(node.name, "w1");
    assert_eq!(node.addr, "127.0.0.1:50061");
    assert!(node.last_sync_ms > 0);
    assert!(node.resource.is_some());
}

#[tokio::test]
async fn launch_with_empty_registry_is_not_found() {
    let api = ApiService::new(Arc::new(Registry::new()));
    let err = api.launch(Request::new(LaunchRequest::default())).await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn info_skips_failing_workers() {
    let healthy = Arc::new(FakeHypervisor::new());
    healthy.set_details(vec![InstanceDetail { name: "alpha".into(), ..Default::default() }]);
    let broken = Arc::new(FakeHypervisor::new());
    broken.fail_info(true);

    let registry = Arc::new(Registry::new());
    registry.insert(live_session("healthy", healthy).await);
    registry.insert(live_session("broken", broken).await);
    let api = ApiService::new(Arc::clone(&registry));

    let reply = api.info(Request::new(GetInfoRequest {})).await.unwrap().into_inner();

    // The failing worker is absent, the healthy one fully present, and the
    // aggregate itself succeeds.
    assert_eq!(reply.instances.len(), 1);
    assert_eq!(reply.instances[0].node_name, "healthy");
}

#[tokio::test]
async fn shell_for_unknown_instance_is_not_found() {
    let registry = Arc::new(Registry::new());
    registry.insert(offline_session("w1", &["alpha"]));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let api = ApiService::new(registry);
    tokio::spawn(async move {
        Server::builder()
            .add_service(ApiServer::new(api))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    let mut client = ApiClient::connect(format!("http://{addr}")).await.unwrap();
    let mut request = Request::new(tokio_stream::iter(Vec::<ShellRequest>::new()));
    attachments::insert_str(request.metadata_mut(), attachments::INSTANCE_NAME, "ghost").unwrap();
    attachments::insert_str(request.metadata_mut(), attachments::WIDTH, "80").unwrap();
    attachments::insert_str(request.metadata_mut(), attachments::HEIGHT, "24").unwrap();

    let err = client.shell(request).await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
    assert!(err.message().contains("ghost"));
}
