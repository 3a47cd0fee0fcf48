// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Defaults mirror a stock multipass install: the daemon's client
//! certificate lives under the per-OS multipass data directory, and the
//! node name falls back to the hostname.

use std::path::PathBuf;

use clap::Parser;

/// Flotilla daemon: run the master role, the worker role, or both.
#[derive(Debug, Parser)]
#[command(name = "flotillad", version, about)]
pub struct Config {
    /// Run as master
    #[arg(long)]
    pub master: bool,

    /// Run as worker
    #[arg(long)]
    pub worker: bool,

    /// Master cluster address (listen for master, connect for worker)
    #[arg(long, default_value = "localhost:1337")]
    pub master_addr: String,

    /// Api server address to listen on
    #[arg(long, default_value = "localhost:1338")]
    pub api_addr: String,

    /// Node name reported when joining the cluster
    #[arg(long, default_value_t = default_node_name())]
    pub node_name: String,

    /// Host the worker's agent service binds on (ephemeral port)
    #[arg(long, default_value = "localhost")]
    pub agent_bind: String,

    /// Multipass daemon address to connect to
    #[arg(long, default_value = "localhost:50051")]
    pub multipass_addr: String,

    /// Multipass client certificate for tls
    #[arg(long, default_value_os_t = default_cert_dir().join("multipass_cert.pem"))]
    pub multipass_cert_file: PathBuf,

    /// Multipass client key for tls
    #[arg(long, default_value_os_t = default_cert_dir().join("multipass_cert_key.pem"))]
    pub multipass_key_file: PathBuf,
}

fn default_node_name() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| "flotilla-node".to_string())
}

/// Directory multipass keeps its issued client certificate in.
fn default_cert_dir() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    let data_dir = if cfg!(target_os = "linux") {
        home.join("snap/multipass/current/data")
    } else if cfg!(target_os = "macos") {
        home.join("Library/Application Support")
    } else {
        home.join(".config")
    };
    data_dir.join("multipass-client-certificate")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
