//! The background task that drains the socket into the inbound queue.
//!
//! Sole reader of the socket, sole producer into the queue. Never parses
//! message bodies beyond what [`crate::bgp::BgpMessage::describe`] needs
//! for a log line, and never treats a malformed body as fatal — only a
//! framing error (advertised length below the header size), an I/O error,
//! or EOF end the task.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::bgp::endec::BgpCodec;
use futures_util::StreamExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::FramedRead;

pub async fn run(
    read_half: OwnedReadHalf,
    tx: mpsc::Sender<crate::bgp::BgpMessage>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut framed = FramedRead::new(read_half, BgpCodec);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::debug!("receiver task shutting down on close()");
                return;
            }
            item = framed.next() => {
                match item {
                    Some(Ok(msg)) => {
                        log::info!("received {}", msg.describe());
                        if tx.send(msg).await.is_err() {
                            log::debug!("interpreter dropped the inbound queue, stopping receiver");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        log::warn!("framing error, terminating receiver: {e}");
                        return;
                    }
                    None => {
                        log::info!("peer closed the connection");
                        return;
                    }
                }
            }
        }
    }
}
