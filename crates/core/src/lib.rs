// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core domain types for the flotilla cluster.
//!
//! Everything here is transport-agnostic: instances, resource summaries,
//! node snapshots, and session identifiers. Wire conversions live in
//! `flotilla-proto`; nothing in this crate performs I/O.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod id;
mod instance;
mod resource;
mod state;

pub use id::SessionId;
pub use instance::{Instance, InstanceDetail, LaunchSpec};
pub use resource::{CpuResource, DiskResource, MemoryResource, ResourceSummary};
pub use state::NodeState;
