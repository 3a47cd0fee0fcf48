// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hypervisor access for workers.
//!
//! The control plane consumes exactly four hypervisor operations: inventory
//! listing, per-instance telemetry, SSH credential lookup, and launch. The
//! [`Hypervisor`] trait is that seam; [`MultipassClient`] implements it
//! against a multipass daemon over TLS, and the `test-support` feature adds
//! an in-memory fake for tests.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use flotilla_core::{Instance, InstanceDetail, LaunchSpec};

mod multipass;
pub use multipass::MultipassClient;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeHypervisor;

/// SSH credentials and endpoint for one instance, as issued by the
/// hypervisor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshEndpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// PEM-encoded private key text.
    pub private_key: String,
}

/// Errors from the hypervisor boundary.
#[derive(Debug, Error)]
pub enum HypervisorError {
    #[error("hypervisor transport: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("hypervisor call failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    #[error("reading {path}: {source}")]
    Credentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("hypervisor closed the stream without a reply")]
    EmptyReply,
}

/// The hypervisor operations the control plane consumes.
#[async_trait]
pub trait Hypervisor: Send + Sync {
    /// Current instance inventory.
    async fn list(&self) -> Result<Vec<Instance>, HypervisorError>;

    /// Per-instance telemetry.
    async fn info(&self) -> Result<Vec<InstanceDetail>, HypervisorError>;

    /// SSH endpoint and credentials for one instance.
    async fn ssh_info(&self, instance_name: &str) -> Result<SshEndpoint, HypervisorError>;

    /// Launch a new instance. Returns once the daemon acknowledges.
    async fn launch(&self, spec: LaunchSpec) -> Result<(), HypervisorError>;
}
