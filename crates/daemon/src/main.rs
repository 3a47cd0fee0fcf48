// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `flotillad`, the flotilla daemon binary.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use flotilla_daemon::config::Config;
use flotilla_daemon::{lifecycle, master, worker};
use flotilla_hypervisor::MultipassClient;

#[tokio::main]
async fn main() -> ExitCode {
    lifecycle::init_tracing();
    let config = Config::parse();

    if !config.master && !config.worker {
        error!("no role selected; pass --master, --worker, or both");
        return ExitCode::from(2);
    }

    // Kept alive for the life of the process; its tasks serve until exit.
    let _master = if config.master {
        match master::Master::start(&config.master_addr, &config.api_addr).await {
            Ok(master) => Some(master),
            Err(err) => {
                error!(%err, "failed to start master");
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };

    let worker = if config.worker {
        let hypervisor = match MultipassClient::new(
            &config.multipass_addr,
            &config.multipass_cert_file,
            &config.multipass_key_file,
        ) {
            Ok(client) => Arc::new(client),
            Err(err) => {
                error!(%err, "failed to create multipass client");
                return ExitCode::FAILURE;
            }
        };

        let worker_config = worker::WorkerConfig {
            master_addr: config.master_addr.clone(),
            node_name: config.node_name.clone(),
            agent_bind: config.agent_bind.clone(),
            sample_interval: worker::SAMPLE_INTERVAL,
        };
        match worker::Worker::start(hypervisor, worker_config).await {
            Ok(worker) => Some(worker),
            Err(err) => {
                error!(%err, "failed to start worker");
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };

    if let Err(err) = lifecycle::shutdown_signal().await {
        error!(%err, "signal handler failed");
        return ExitCode::FAILURE;
    }

    if let Some(worker) = worker {
        worker.close();
    }
    info!("flotilla daemon shutting down");
    ExitCode::SUCCESS
}
