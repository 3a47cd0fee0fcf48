// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for the flotilla cluster.
//!
//! Generated tonic services plus the two pieces of glue every role needs:
//! stream-scoped attachment (gRPC metadata) helpers and conversions between
//! wire messages and `flotilla-core` domain types.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod attachments;
mod convert;

pub mod common {
    tonic::include_proto!("flotilla.common");
}

pub mod cluster {
    tonic::include_proto!("flotilla.cluster");
}

pub mod agent {
    tonic::include_proto!("flotilla.agent");
}

pub mod api {
    tonic::include_proto!("flotilla.api");
}

pub mod multipass {
    tonic::include_proto!("multipass");
}
