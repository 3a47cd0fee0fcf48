// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }
    tonic_build::configure().compile_protos(
        &[
            "proto/common.proto",
            "proto/cluster.proto",
            "proto/agent.proto",
            "proto/api.proto",
            "proto/multipass.proto",
        ],
        &["proto"],
    )?;
    Ok(())
}
