// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `flotilla`, the thin client for the cluster api.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use anyhow::Result;
use clap::{Parser, Subcommand};

use flotilla_proto::common::LaunchRequest;

mod client;
mod output;
mod shell;

use client::ApiClient;

#[derive(Debug, Parser)]
#[command(name = "flotilla", version, about = "Client for a flotilla cluster")]
struct Cli {
    /// Api server address
    #[arg(long, default_value = "localhost:1338")]
    api_addr: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List instances across all nodes
    Instances,
    /// List connected nodes and their resources
    Nodes,
    /// Show per-instance telemetry across all nodes
    Info,
    /// Launch an instance somewhere in the cluster
    Launch {
        /// Name for the new instance
        name: String,
        /// Number of cpu cores
        #[arg(long, default_value_t = 1)]
        cpus: i32,
        /// Memory size, e.g. 2G
        #[arg(long, default_value = "1G")]
        mem: String,
        /// Disk size, e.g. 10G
        #[arg(long, default_value = "5G")]
        disk: String,
    },
    /// Open an interactive shell inside an instance
    Shell {
        /// Target instance name
        instance: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut client = ApiClient::connect(&cli.api_addr).await?;

    match cli.command {
        Command::Instances => {
            let instances = client.instances().await?;
            print!("{}", output::instances_table(&instances));
        }
        Command::Nodes => {
            let nodes = client.nodes().await?;
            print!("{}", output::nodes_table(&nodes));
        }
        Command::Info => {
            let details = client.info().await?;
            print!("{}", output::info_table(&details));
        }
        Command::Launch { name, cpus, mem, disk } => {
            client
                .launch(LaunchRequest {
                    instance_name: name.clone(),
                    num_cores: cpus,
                    mem_size: mem,
                    disk_space: disk,
                })
                .await?;
            println!("launch of '{name}' accepted");
        }
        Command::Shell { instance } => {
            // The stdin forwarder may still be parked in a blocking read;
            // exit directly rather than waiting for a final keypress.
            match shell::run(&mut client, &instance).await {
                Ok(()) => std::process::exit(0),
                Err(err) => {
                    eprintln!("error: {err:#}");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
