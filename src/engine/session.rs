//! Owns the TCP connection, the inbound queue, and the receiver task for
//! the lifetime of one connected (or not-yet-connected) session.

// SPDX-License-Identifier: AGPL-3.0-or-later

use super::{receiver, Error};
use crate::bgp::BgpMessage;
use crate::scenario::PeerConfig;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub struct Session {
    write_half: Option<OwnedWriteHalf>,
    inbound: Option<mpsc::Receiver<BgpMessage>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    receiver_task: Option<JoinHandle<()>>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            write_half: None,
            inbound: None,
            shutdown_tx: None,
            receiver_task: None,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.write_half.is_some()
    }

    pub async fn connect(&mut self, peer: PeerConfig) -> Result<(), Error> {
        let stream = TcpStream::connect((peer.ip, peer.port)).await?;
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(receiver::run(read_half, tx, shutdown_rx));
        self.write_half = Some(write_half);
        self.inbound = Some(rx);
        self.shutdown_tx = Some(shutdown_tx);
        self.receiver_task = Some(task);
        Ok(())
    }

    pub async fn send(&mut self, bytes: &[u8], operation: &'static str, index: usize) -> Result<(), Error> {
        let w = self
            .write_half
            .as_mut()
            .ok_or(Error::NotConnected { index, operation })?;
        w.write_all(bytes).await?;
        Ok(())
    }

    /// Dequeue one message, or `None` if `deadline` elapses first.
    pub async fn recv(&mut self, deadline: std::time::Duration) -> Option<BgpMessage> {
        let rx = self.inbound.as_mut()?;
        tokio::time::timeout(deadline, rx.recv()).await.ok().flatten()
    }

    /// Close the connection. Safe to call even if never connected, and
    /// safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut w) = self.write_half.take() {
            let _ = w.shutdown().await;
        }
        self.inbound.take();
        if let Some(task) = self.receiver_task.take() {
            let _ = task.await;
        }
    }
}
