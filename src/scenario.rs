//! The typed scenario data model.
//!
//! Everything here is produced once, by [`crate::config::load`], from the
//! YAML document on disk. The interpreter never again touches an untyped
//! map: every operation and every parameter shape has already been
//! validated by the time a [`Scenario`] exists.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::bgp::cidr::Cidr4;
use std::net::Ipv4Addr;
use std::time::Duration;

/// The default deadline for a `receive_*` step with no narrower bound.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(100);

/// Local session parameters, overlaid onto any scripted OPEN message.
#[derive(Clone, Copy, Debug)]
pub struct LocalConfig {
    pub holdtime: u16,
    pub asn: u16,
    pub id: Ipv4Addr,
}

/// The remote speaker to dial.
#[derive(Clone, Copy, Debug)]
pub struct PeerConfig {
    pub ip: std::net::IpAddr,
    pub port: u16,
}

/// A raw, opaque `(code, value)` tuple copied verbatim into an OPEN's
/// capability optional parameter. The engine does not need to understand
/// what a capability code means to forward it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawCapability {
    pub code: u8,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenParam {
    pub capabilities: Vec<RawCapability>,
}

/// A raw `(flag, type, value)` path attribute tuple. The length field is
/// always recomputed from `value.len()` at serialisation time; a scenario
/// wanting a deliberately wrong length must use [`RawParam`] instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathAttr {
    pub flag: u8,
    pub typ: u8,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateParam {
    pub withdrawn: Vec<Cidr4>,
    pub path_attrs: Vec<PathAttr>,
    pub nlri: Vec<Cidr4>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotificationParam {
    pub code: u8,
    pub subcode: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteRefreshParam {
    pub afi: u16,
    pub safi: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawParam {
    pub bytes: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SleepParam {
    pub seconds: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NothingParam {
    pub seconds: u64,
}

/// Which BGP message type a bare `receive_bgp_*` step expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveKind {
    Open,
    Update,
    Notification,
    Keepalive,
    RouteRefresh,
}

impl ReceiveKind {
    #[must_use]
    pub fn matches(self, msg_type: crate::bgp::MessageType) -> bool {
        use crate::bgp::MessageType as M;
        matches!(
            (self, msg_type),
            (Self::Open, M::Open)
                | (Self::Update, M::Update)
                | (Self::Notification, M::Notification)
                | (Self::Keepalive, M::Keepalive)
                | (Self::RouteRefresh, M::RouteRefresh)
        )
    }
}

/// One step of a scenario.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Connect,
    Close,
    SendOpen(OpenParam),
    SendUpdate(UpdateParam),
    SendNotification(NotificationParam),
    SendKeepalive,
    SendRouteRefresh(RouteRefreshParam),
    SendRaw(RawParam),
    Receive(ReceiveKind),
    ReceiveNothing(NothingParam),
    /// Succeeds iff one dequeued message matches one of the `Receive`
    /// alternatives, or the deadline (derived from any nested
    /// `ReceiveNothing`) expires while `ReceiveNothing` is present.
    ReceiveOneOfThem(Vec<Step>),
    Sleep(SleepParam),
}

impl Step {
    /// The deadline `receive_one_of_them` waits for: the minimum of
    /// [`DEFAULT_WAIT`] and any nested `receive_nothing`'s duration.
    #[must_use]
    pub fn one_of_them_deadline(alternatives: &[Step]) -> Duration {
        alternatives
            .iter()
            .filter_map(|s| match s {
                Step::ReceiveNothing(p) => Some(Duration::from_secs(p.seconds)),
                _ => None,
            })
            .chain(std::iter::once(DEFAULT_WAIT))
            .min()
            .unwrap()
    }

    /// Whether any alternative is a `receive_nothing`, which allows a true
    /// timeout to count as success.
    #[must_use]
    pub fn one_of_them_accepts_timeout(alternatives: &[Step]) -> bool {
        alternatives
            .iter()
            .any(|s| matches!(s, Step::ReceiveNothing(_)))
    }
}

/// A fully parsed, ordered list of steps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scenario(pub Vec<Step>);

impl Scenario {
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_falls_back_to_default_wait() {
        let alts = vec![Step::Receive(ReceiveKind::Notification)];
        assert_eq!(Step::one_of_them_deadline(&alts), DEFAULT_WAIT);
    }

    #[test]
    fn deadline_uses_narrower_receive_nothing() {
        let alts = vec![
            Step::Receive(ReceiveKind::Notification),
            Step::ReceiveNothing(NothingParam { seconds: 5 }),
        ];
        assert_eq!(
            Step::one_of_them_deadline(&alts),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn deadline_clamps_receive_nothing_longer_than_default_wait() {
        let alts = vec![Step::ReceiveNothing(NothingParam { seconds: 200 })];
        assert_eq!(Step::one_of_them_deadline(&alts), DEFAULT_WAIT);
    }

    #[test]
    fn timeout_only_accepted_with_receive_nothing_present() {
        let with_nothing = vec![Step::ReceiveNothing(NothingParam { seconds: 5 })];
        let without_nothing = vec![Step::Receive(ReceiveKind::Keepalive)];
        assert!(Step::one_of_them_accepts_timeout(&with_nothing));
        assert!(!Step::one_of_them_accepts_timeout(&without_nothing));
    }
}
