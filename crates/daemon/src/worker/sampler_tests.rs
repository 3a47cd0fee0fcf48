// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flotilla_hypervisor::FakeHypervisor;

#[tokio::test]
async fn publishes_inventory_and_resources() {
    let fake = Arc::new(FakeHypervisor::with_instances(&["alpha", "beta"]));
    let (sampler, mut rx) = Sampler::new(fake);

    let mut system = System::new();
    sampler.sample_once(&mut system).await;

    rx.changed().await.unwrap();
    let snapshot = rx.borrow_and_update().clone();
    assert!(snapshot.has_instance("alpha"));
    assert!(snapshot.has_instance("beta"));
}

#[tokio::test]
async fn listing_failure_keeps_prior_inventory() {
    let fake = Arc::new(FakeHypervisor::with_instances(&["alpha"]));
    let (sampler, mut rx) = Sampler::new(Arc::clone(&fake));

    let mut system = System::new();
    sampler.sample_once(&mut system).await;
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().has_instance("alpha"));

    fake.fail_list(true);
    sampler.sample_once(&mut system).await;

    // The failed tick still publishes: resources refresh, inventory holds.
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().has_instance("alpha"));
}

#[tokio::test]
async fn state_handle_tracks_latest_snapshot() {
    let fake = Arc::new(FakeHypervisor::with_instances(&["alpha"]));
    let (sampler, _rx) = Sampler::new(Arc::clone(&fake));
    let state = sampler.state();

    let mut system = System::new();
    sampler.sample_once(&mut system).await;
    assert!(state.read().has_instance("alpha"));

    fake.set_instances(vec![]);
    sampler.sample_once(&mut system).await;
    assert!(state.read().instances.is_empty());
}

#[test]
fn disk_policy_prefers_root_mount() {
    let mounts =
        [(Path::new("/boot"), 500, 100), (Path::new("/"), 1000, 400), (Path::new("/home"), 2000, 900)];
    let disk = disk_from_mounts(&mounts);
    assert_eq!(disk.total, 1000);
    assert_eq!(disk.available, 400);
}

#[test]
fn disk_policy_sums_mounts_without_root() {
    let mounts = [(Path::new("/data"), 1000, 400), (Path::new("/scratch"), 500, 250)];
    let disk = disk_from_mounts(&mounts);
    assert_eq!(disk.total, 1500);
    assert_eq!(disk.available, 650);
}

#[test]
fn disk_policy_empty_mounts() {
    let disk = disk_from_mounts(&[]);
    assert_eq!(disk.total, 0);
    assert_eq!(disk.available, 0);
}
