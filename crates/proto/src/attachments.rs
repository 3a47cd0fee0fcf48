// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream-scoped attachments.
//!
//! Identity and terminal geometry travel as gRPC metadata on stream open,
//! not in the first payload frame. Keys are lowercase per the metadata
//! grammar; a missing or malformed attachment is an invalid-argument error
//! surfaced to the caller.

use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::Status;

/// Worker's self-reported node name, sent on `cluster.Sync`.
pub const NODE_NAME: &str = "node-name";
/// Port the worker's agent service listens on, decimal string.
pub const AGENT_PORT: &str = "agent-port";
/// Target VM name, sent on `api.Shell` and forwarded to `agent.Shell`.
pub const INSTANCE_NAME: &str = "instance-name";
/// Initial terminal width in columns, decimal string.
pub const WIDTH: &str = "width";
/// Initial terminal height in rows, decimal string.
pub const HEIGHT: &str = "height";

/// Fetch a required string attachment.
pub fn required_str<'a>(md: &'a MetadataMap, key: &str) -> Result<&'a str, Status> {
    md.get(key)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Status::invalid_argument(format!("{key} not found in attachments")))
}

/// Fetch a required numeric attachment (decimal string encoding).
pub fn required_u32(md: &MetadataMap, key: &str) -> Result<u32, Status> {
    required_str(md, key)?
        .parse()
        .map_err(|_| Status::invalid_argument(format!("{key} attachment is not a number")))
}

/// Insert a string attachment, rejecting values the metadata grammar forbids.
pub fn insert_str(md: &mut MetadataMap, key: &'static str, value: &str) -> Result<(), Status> {
    let value = MetadataValue::try_from(value)
        .map_err(|_| Status::invalid_argument(format!("{key} is not valid metadata")))?;
    md.insert(key, value);
    Ok(())
}

/// Copy the named attachments from one stream's metadata to another's.
///
/// Used by the api shell proxy so the agent sees exactly what the client
/// sent. Keys absent on the source are skipped.
pub fn copy(from: &MetadataMap, to: &mut MetadataMap, keys: &[&'static str]) {
    for key in keys {
        if let Some(value) = from.get(*key) {
            to.insert(*key, value.clone());
        }
    }
}

#[cfg(test)]
#[path = "attachments_tests.rs"]
mod tests;
