//! Sequential execution of a scenario's steps.
//!
//! The interpreter is the sole consumer of the inbound queue and the sole
//! writer to the socket; the receiver task (`super::receiver`) is the sole
//! reader. Any I/O error, framing error, or expectation violation is
//! fatal: this function returns on the first one rather than attempting
//! recovery or retry.

// SPDX-License-Identifier: AGPL-3.0-or-later

use super::session::Session;
use super::Error;
use crate::bgp::builders;
use crate::scenario::{LocalConfig, PeerConfig, ReceiveKind, Step};
use std::time::Duration;

pub async fn execute(
    steps: &[Step],
    session: &mut Session,
    local: &LocalConfig,
    peer: PeerConfig,
    index_offset: usize,
) -> Result<(), Error> {
    for (i, step) in steps.iter().enumerate() {
        let index = index_offset + i;
        log::info!("step {index}: {}", op_name(step));
        execute_step(index, step, session, local, peer).await?;
    }
    Ok(())
}

async fn execute_step(
    index: usize,
    step: &Step,
    session: &mut Session,
    local: &LocalConfig,
    peer: PeerConfig,
) -> Result<(), Error> {
    match step {
        Step::Connect => {
            if session.is_connected() {
                return Err(Error::AlreadyConnected { index });
            }
            session.connect(peer).await?;
            Ok(())
        }
        Step::Close => {
            session.close().await;
            Ok(())
        }
        Step::SendOpen(param) => {
            let bytes = builders::open(param, local)?;
            session.send(&bytes, "send_bgp_open", index).await
        }
        Step::SendUpdate(param) => {
            let bytes = builders::update(param)?;
            session.send(&bytes, "send_bgp_update", index).await
        }
        Step::SendNotification(param) => {
            let bytes = builders::notification(param)?;
            session.send(&bytes, "send_bgp_notification", index).await
        }
        Step::SendKeepalive => {
            let bytes = builders::keepalive()?;
            session.send(&bytes, "send_bgp_keepalive", index).await
        }
        Step::SendRouteRefresh(param) => {
            let bytes = builders::route_refresh(param)?;
            session.send(&bytes, "send_bgp_routerefresh", index).await
        }
        Step::SendRaw(param) => {
            let bytes = builders::raw(&param.bytes);
            session.send(&bytes, "send_bgp_raw", index).await
        }
        Step::Sleep(param) => {
            tokio::time::sleep(Duration::from_secs(param.seconds)).await;
            Ok(())
        }
        Step::Receive(kind) => receive_one(index, *kind, session).await,
        Step::ReceiveNothing(param) => {
            let deadline = Duration::from_secs(param.seconds);
            match session.recv(deadline).await {
                Some(msg) => Err(Error::UnexpectedArrival {
                    index,
                    received: msg.msg_type.to_string(),
                }),
                None => Ok(()),
            }
        }
        Step::ReceiveOneOfThem(alternatives) => receive_one_of_them(index, alternatives, session).await,
    }
}

async fn receive_one(index: usize, kind: ReceiveKind, session: &mut Session) -> Result<(), Error> {
    match session.recv(crate::scenario::DEFAULT_WAIT).await {
        Some(msg) if kind.matches(msg.msg_type) => Ok(()),
        Some(msg) => Err(Error::UnexpectedType {
            index,
            expected: receive_kind_name(kind).to_owned(),
            received: msg.msg_type.to_string(),
        }),
        None => Err(Error::Timeout {
            index,
            expected: receive_kind_name(kind).to_owned(),
            waited: crate::scenario::DEFAULT_WAIT,
        }),
    }
}

async fn receive_one_of_them(
    index: usize,
    alternatives: &[Step],
    session: &mut Session,
) -> Result<(), Error> {
    let deadline = Step::one_of_them_deadline(alternatives);
    let accepts_timeout = Step::one_of_them_accepts_timeout(alternatives);
    let expected_kinds: Vec<ReceiveKind> = alternatives
        .iter()
        .filter_map(|s| match s {
            Step::Receive(kind) => Some(*kind),
            _ => None,
        })
        .collect();

    match session.recv(deadline).await {
        Some(msg) if expected_kinds.iter().any(|k| k.matches(msg.msg_type)) => Ok(()),
        Some(msg) => Err(Error::OneOfThemMismatch {
            index,
            received: msg.msg_type.to_string(),
        }),
        None if accepts_timeout => Ok(()),
        None => Err(Error::OneOfThemTimeout { index }),
    }
}

fn receive_kind_name(kind: ReceiveKind) -> &'static str {
    match kind {
        ReceiveKind::Open => "OPEN",
        ReceiveKind::Update => "UPDATE",
        ReceiveKind::Notification => "NOTIFICATION",
        ReceiveKind::Keepalive => "KEEPALIVE",
        ReceiveKind::RouteRefresh => "ROUTE-REFRESH",
    }
}

fn op_name(step: &Step) -> &'static str {
    match step {
        Step::Connect => "connect",
        Step::Close => "close",
        Step::SendOpen(_) => "send_bgp_open",
        Step::SendUpdate(_) => "send_bgp_update",
        Step::SendNotification(_) => "send_bgp_notification",
        Step::SendKeepalive => "send_bgp_keepalive",
        Step::SendRouteRefresh(_) => "send_bgp_routerefresh",
        Step::SendRaw(_) => "send_bgp_raw",
        Step::Sleep(_) => "sleep",
        Step::Receive(ReceiveKind::Open) => "receive_bgp_open",
        Step::Receive(ReceiveKind::Update) => "receive_bgp_update",
        Step::Receive(ReceiveKind::Notification) => "receive_bgp_notification",
        Step::Receive(ReceiveKind::Keepalive) => "receive_bgp_keepalive",
        Step::Receive(ReceiveKind::RouteRefresh) => "receive_bgp_routerefresh",
        Step::ReceiveNothing(_) => "receive_nothing",
        Step::ReceiveOneOfThem(_) => "receive_one_of_them",
    }
}
