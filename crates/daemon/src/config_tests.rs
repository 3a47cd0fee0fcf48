// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_parse_without_flags() {
    let cfg = Config::parse_from(["flotillad"]);
    assert!(!cfg.master);
    assert!(!cfg.worker);
    assert_eq!(cfg.master_addr, "localhost:1337");
    assert_eq!(cfg.api_addr, "localhost:1338");
    assert!(!cfg.node_name.is_empty());
    assert!(cfg.multipass_cert_file.ends_with("multipass-client-certificate/multipass_cert.pem"));
}

#[test]
fn roles_can_be_combined() {
    let cfg = Config::parse_from(["flotillad", "--master", "--worker"]);
    assert!(cfg.master);
    assert!(cfg.worker);
}

#[test]
fn addresses_are_overridable() {
    let cfg = Config::parse_from([
        "flotillad",
        "--worker",
        "--master-addr",
        "10.0.0.1:1337",
        "--node-name",
        "lab-3",
    ]);
    assert_eq!(cfg.master_addr, "10.0.0.1:1337");
    assert_eq!(cfg.node_name, "lab-3");
}
