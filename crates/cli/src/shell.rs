// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive shell (proxy segment nearest the user).
//!
//! Puts the controlling terminal into raw mode behind an RAII guard, opens
//! the duplex stream with the instance name and initial geometry attached,
//! and then runs three concerns: a stdin forwarder stamping the current
//! dimensions on every frame, a SIGWINCH handler that refreshes those
//! dimensions and emits an empty-payload resize frame, and the main drain
//! writing remote output to stdout and stderr. The guard restores the
//! terminal on every exit path, including errors before the first byte.

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Request;

use flotilla_proto::attachments;
use flotilla_proto::common::ShellRequest;

use crate::client::ApiClient;

/// Restores the terminal mode on drop, whatever the exit path.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        crossterm::terminal::enable_raw_mode().context("enabling raw terminal mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

pub async fn run(client: &mut ApiClient, instance: &str) -> Result<()> {
    let (cols, rows) = crossterm::terminal::size().context("reading terminal size")?;

    let (tx, rx) = mpsc::channel::<ShellRequest>(16);
    let mut request = Request::new(ReceiverStream::new(rx));
    let md = request.metadata_mut();
    attachments::insert_str(md, attachments::INSTANCE_NAME, instance)
        .map_err(|status| anyhow::anyhow!("instance name {instance:?}: {status}"))?;
    attachments::insert_str(md, attachments::WIDTH, &cols.to_string())
        .map_err(|status| anyhow::anyhow!("{status}"))?;
    attachments::insert_str(md, attachments::HEIGHT, &rows.to_string())
        .map_err(|status| anyhow::anyhow!("{status}"))?;

    let guard = RawModeGuard::enable()?;

    let mut inbound = match client.shell(request).await {
        Ok(inbound) => inbound,
        Err(status) => {
            drop(guard);
            anyhow::bail!("{}", status.message());
        }
    };

    // Dimensions shared between the stdin forwarder and the resize handler.
    let size = Arc::new(Mutex::new((cols, rows)));

    let stdin_size = Arc::clone(&size);
    let stdin_tx = tx.clone();
    tokio::spawn(async move {
        let mut stdin = tokio::io::stdin();
        let mut buf = [0u8; 4096];
        loop {
            match stdin.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let (width, height) = *stdin_size.lock();
                    let frame = ShellRequest {
                        in_buffer: buf[..n].to_vec(),
                        width: i64::from(width),
                        height: i64::from(height),
                    };
                    if stdin_tx.send(frame).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let winch_size = Arc::clone(&size);
    let winch_tx = tx;
    tokio::spawn(async move {
        let Ok(mut winch) = signal(SignalKind::window_change()) else {
            return;
        };
        while winch.recv().await.is_some() {
            let Ok((width, height)) = crossterm::terminal::size() else {
                continue;
            };
            *winch_size.lock() = (width, height);
            // Empty payload: a pure resize signal.
            let frame = ShellRequest {
                in_buffer: Vec::new(),
                width: i64::from(width),
                height: i64::from(height),
            };
            if winch_tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();
    let result = loop {
        match inbound.message().await {
            Ok(Some(reply)) => {
                if !reply.out_buffer.is_empty() {
                    stdout.write_all(&reply.out_buffer).await?;
                    stdout.flush().await?;
                }
                if !reply.err_buffer.is_empty() {
                    stderr.write_all(&reply.err_buffer).await?;
                    stderr.flush().await?;
                }
            }
            Ok(None) => break Ok(()),
            Err(status) => break Err(anyhow::anyhow!("{}", status.message())),
        }
    };

    drop(guard);
    result
}
