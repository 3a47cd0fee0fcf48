// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH bridge for shell sessions (proxy segment nearest the VM).
//!
//! Each accepted shell stream becomes one SSH connection into the target
//! instance: request frames feed the remote stdin and a window-size signal,
//! PTY output and stderr come back as reply frames. The session owns
//! exactly one SSH client and one channel; every exit path releases both
//! and removes the session from the per-agent map.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use russh::client;
use russh::keys::{decode_secret_key, PrivateKeyWithHashAlg, PublicKey};
use russh::{cipher, ChannelMsg, Disconnect, Preferred, Pty};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tonic::{Status, Streaming};
use tracing::{debug, info, warn};

use flotilla_core::SessionId;
use flotilla_hypervisor::SshEndpoint;
use flotilla_proto::common::{ShellReply, ShellRequest};

/// SSH dial budget.
const DIAL_TIMEOUT: Duration = Duration::from_secs(20);

/// Terminal geometry, carried out-of-band next to the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("ssh: {0}")]
    Ssh(#[from] russh::Error),

    #[error("invalid ssh key: {0}")]
    Key(#[from] russh::keys::Error),

    #[error("ssh dial timed out")]
    DialTimeout,

    #[error("ssh authentication rejected")]
    AuthRejected,

    #[error("remote shell exited with status {0}")]
    RemoteExit(u32),
}

/// Live shell sessions on this agent, keyed by a fresh id per stream.
///
/// Removal cancels the session's token; the bridge task observes the cancel,
/// tears down the SSH connection, and exits.
#[derive(Default)]
pub struct ShellSessionMap {
    sessions: RwLock<HashMap<SessionId, CancellationToken>>,
}

impl ShellSessionMap {
    fn insert(&self, id: SessionId, cancel: CancellationToken) {
        self.sessions.write().insert(id, cancel);
    }

    fn remove(&self, id: &SessionId) {
        if let Some(cancel) = self.sessions.write().remove(id.as_str()) {
            cancel.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Tear down every live session (worker graceful stop).
    pub fn close_all(&self) {
        for (_, cancel) in self.sessions.write().drain() {
            cancel.cancel();
        }
    }
}

/// Host keys are accepted: agent endpoints are loopback-discovered and the
/// credentials come from the TLS-authenticated hypervisor daemon.
struct AcceptingHostKey;

impl client::Handler for AcceptingHostKey {
    type Error = russh::Error;

    async fn check_server_key(&mut self, _server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Drive one shell session to completion.
pub(super) async fn run(
    endpoint: SshEndpoint,
    inbound: Streaming<ShellRequest>,
    replies: mpsc::Sender<Result<ShellReply, Status>>,
    size: WindowSize,
    sessions: Arc<ShellSessionMap>,
) {
    let id = SessionId::generate();
    let cancel = CancellationToken::new();
    sessions.insert(id.clone(), cancel.clone());

    let result = bridge(endpoint, inbound, &replies, size, &cancel, &id).await;

    sessions.remove(&id);
    match result {
        Ok(()) => info!(%id, "ssh disconnected"),
        Err(err) => {
            warn!(%id, %err, "ssh session failed");
            let _ = replies.send(Err(Status::internal(err.to_string()))).await;
        }
    }
}

async fn bridge(
    endpoint: SshEndpoint,
    inbound: Streaming<ShellRequest>,
    replies: &mpsc::Sender<Result<ShellReply, Status>>,
    initial: WindowSize,
    cancel: &CancellationToken,
    id: &SessionId,
) -> Result<(), ShellError> {
    let key = decode_secret_key(&endpoint.private_key, None)?;

    let config = client::Config {
        preferred: Preferred {
            cipher: Cow::Borrowed(&[cipher::CHACHA20_POLY1305, cipher::AES_256_CTR]),
            ..Default::default()
        },
        ..Default::default()
    };

    let mut handle = timeout(
        DIAL_TIMEOUT,
        client::connect(Arc::new(config), (endpoint.host.as_str(), endpoint.port), AcceptingHostKey),
    )
    .await
    .map_err(|_| ShellError::DialTimeout)??;

    let hash = handle.best_supported_rsa_hash().await?.flatten();
    let auth = handle
        .authenticate_publickey(
            endpoint.username.clone(),
            PrivateKeyWithHashAlg::new(Arc::new(key), hash),
        )
        .await?;
    if !auth.success() {
        return Err(ShellError::AuthRejected);
    }
    info!(%id, host = %endpoint.host, "ssh connected");

    let channel = handle.channel_open_session().await?;
    let term = std::env::var("TERM").unwrap_or_else(|_| "xterm".to_string());
    channel
        .request_pty(
            false,
            &term,
            initial.width,
            initial.height,
            0,
            0,
            &[(Pty::ECHO, 1), (Pty::TTY_OP_ISPEED, 14400), (Pty::TTY_OP_OSPEED, 14400)],
        )
        .await?;
    channel.request_shell(false).await?;

    // Window-size signal is capacity-1; the reader ending closes it, which
    // the pump observes as shutdown of that branch.
    let (winch_tx, winch_rx) = mpsc::channel(1);
    let (stdin_tx, stdin_rx) = mpsc::channel(16);
    let reader = tokio::spawn(read_frames(inbound, stdin_tx, winch_tx, initial));

    let result = pump(channel, replies, stdin_rx, winch_rx, cancel).await;

    reader.abort();
    if let Err(err) = handle.disconnect(Disconnect::ByApplication, "session closed", "").await {
        debug!(%id, %err, "ssh disconnect");
    }
    result
}

/// Consume the request stream: bytes to stdin, geometry to the window-size
/// signal. Both outputs close when the stream ends.
async fn read_frames(
    mut inbound: Streaming<ShellRequest>,
    stdin: mpsc::Sender<Vec<u8>>,
    winch: mpsc::Sender<WindowSize>,
    mut current: WindowSize,
) {
    while let Ok(Some(frame)) = inbound.message().await {
        if let Some(next) = resized(current, frame.width, frame.height) {
            current = next;
            // Capacity-1: bursts collapse to the newest geometry, and a
            // closed signal channel just means the session is going down.
            let _ = winch.try_send(next);
        }
        if !frame.in_buffer.is_empty() && stdin.send(frame.in_buffer).await.is_err() {
            break;
        }
    }
}

/// The new geometry when a frame reports a real change, `None` otherwise.
fn resized(current: WindowSize, width: i64, height: i64) -> Option<WindowSize> {
    let next = WindowSize { width: width as u32, height: height as u32 };
    (next != current && next.width > 0 && next.height > 0).then_some(next)
}

async fn pump(
    mut channel: russh::Channel<client::Msg>,
    replies: &mpsc::Sender<Result<ShellReply, Status>>,
    mut stdin: mpsc::Receiver<Vec<u8>>,
    mut winch: mpsc::Receiver<WindowSize>,
    cancel: &CancellationToken,
) -> Result<(), ShellError> {
    let mut exit_status = None;
    let mut stdin_open = true;
    let mut winch_open = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                // Explicit teardown via the session map.
                return exit_result(exit_status);
            }
            size = winch.recv(), if winch_open => match size {
                Some(size) => channel.window_change(size.width, size.height, 0, 0).await?,
                None => winch_open = false,
            },
            data = stdin.recv(), if stdin_open => match data {
                Some(bytes) => channel.data(&bytes[..]).await?,
                None => {
                    // Client stream ended; half-close and let the shell wind
                    // down on its own.
                    stdin_open = false;
                    let _ = channel.eof().await;
                }
            },
            msg = channel.wait() => match msg {
                Some(ChannelMsg::Data { data }) => {
                    let reply = ShellReply { out_buffer: data.to_vec(), err_buffer: Vec::new() };
                    if replies.send(Ok(reply)).await.is_err() {
                        return exit_result(exit_status);
                    }
                }
                Some(ChannelMsg::ExtendedData { data, ext: 1 }) => {
                    let reply = ShellReply { out_buffer: Vec::new(), err_buffer: data.to_vec() };
                    if replies.send(Ok(reply)).await.is_err() {
                        return exit_result(exit_status);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status: status }) => {
                    exit_status = Some(status);
                }
                Some(ChannelMsg::Close) | None => return exit_result(exit_status),
                Some(_) => {}
            },
        }
    }
}

/// Status 130 is the remote shell ending on SIGINT; treated as clean exit.
fn exit_result(exit_status: Option<u32>) -> Result<(), ShellError> {
    match exit_status {
        Some(code) if code != 0 && code != 130 => Err(ShellError::RemoteExit(code)),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
