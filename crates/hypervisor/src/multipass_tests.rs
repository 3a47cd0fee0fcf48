// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flotilla_proto::multipass::instance_status::Status;

#[test]
fn status_labels_match_daemon_display_names() {
    assert_eq!(status_label(Status::Running), "Running");
    assert_eq!(status_label(Status::DelayedShutdown), "Delayed Shutdown");
    assert_eq!(status_label(Status::Unknown), "Unknown");
}

#[test]
fn new_fails_on_missing_credentials() {
    let err = MultipassClient::new(
        "localhost:50051",
        Path::new("/nonexistent/cert.pem"),
        Path::new("/nonexistent/key.pem"),
    );
    match err {
        Err(HypervisorError::Credentials { path, .. }) => {
            assert_eq!(path, Path::new("/nonexistent/cert.pem"));
        }
        other => panic!("expected credentials error, got {other:?}"),
    }
}
