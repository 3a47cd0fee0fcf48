// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Instant;

fn client_to(addr: &str) -> (SyncClient, watch::Receiver<NodeState>) {
    let (_tx, rx) = watch::channel(NodeState::default());
    let client = SyncClient::new(addr.to_string(), "test-node".to_string(), 50061, rx.clone())
        .with_probe(Duration::from_millis(10), Duration::from_millis(60));
    (client, rx)
}

#[tokio::test]
async fn probe_gives_up_within_budget() {
    // Port 1 refuses immediately; the probe must stop at its budget rather
    // than retrying forever.
    let (client, _rx) = client_to("127.0.0.1:1");
    let started = Instant::now();
    let err = client.connect_ready().await.unwrap_err();
    assert!(matches!(err, SyncError::Unreachable { .. }));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn closed_client_stops_without_reconnecting() {
    let (client, _rx) = client_to("127.0.0.1:1");
    let handle = client.handle();
    handle.close();

    // run() must observe the closed flag and return instead of looping.
    tokio::time::timeout(Duration::from_secs(5), client.run())
        .await
        .unwrap();
}

#[tokio::test]
async fn close_interrupts_an_in_flight_probe() {
    let (client, _rx) = client_to("127.0.0.1:1");
    let handle = client.handle();

    let run = tokio::spawn(client.run());
    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.close();

    tokio::time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap();
}

#[test]
fn bad_master_address_is_reported() {
    let (_tx, rx) = watch::channel(NodeState::default());
    let client = SyncClient::new("bad address".to_string(), "n".to_string(), 1, rx);
    let err = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(client.connect_ready())
        .unwrap_err();
    assert!(matches!(err, SyncError::Address(_)));
}
