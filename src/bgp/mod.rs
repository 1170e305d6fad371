//! BGP-4 wire messages
//!
//! Unlike a full BGP implementation, this module only decodes as much of a
//! received message as is needed to identify its type and to produce a
//! readable log line. The body of a received message is kept as opaque
//! bytes: a peer under test is allowed to send anything, including bodies
//! that do not parse as valid BGP for their declared type, and the driver
//! must not choke on it.

// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod builders;
pub mod cidr;
pub mod endec;

use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;

/// The 16-byte all-ones marker that precedes every BGP message.
pub const MARKER: [u8; 16] = [0xff; 16];

/// Length of the fixed BGP message header (marker + length + type).
pub const HEADER_LEN: usize = 19;

/// Upper bound on a conformant BGP message's total length.
///
/// Messages longer than this are still framed (this driver is used to
/// probe peers that violate the limit), but are logged at `warn`.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Supported BGP version.
pub const BGP_VERSION: u8 = 4;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("BGP message length is too short: {0}")]
    TooShort(u16),
    #[error("hex decode error for {name}: {source}")]
    Hex {
        name: &'static str,
        #[source]
        source: HexError,
    },
    #[error("invalid CIDR block {0:?}")]
    Cidr(String),
    #[error("message length overflow while encoding {0}")]
    LengthOverflow(&'static str),
}

/// An odd-length or non-hex-digit input to a scripted byte value.
#[derive(thiserror::Error, Debug)]
#[error("odd-length or invalid hex string")]
pub struct HexError;

/// Decode a hex string (case-insensitive) into raw bytes.
///
/// Used for every scenario-supplied byte blob: capability values, raw
/// path-attribute values, and `send_bgp_raw` payloads.
pub fn hex_decode(name: &'static str, s: &str) -> Result<Vec<u8>, Error> {
    if s.len() % 2 != 0 {
        return Err(Error::Hex {
            name,
            source: HexError,
        });
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for chunk in bytes.chunks(2) {
        let hi = (chunk[0] as char)
            .to_digit(16)
            .ok_or(Error::Hex {
                name,
                source: HexError,
            })?;
        let lo = (chunk[1] as char)
            .to_digit(16)
            .ok_or(Error::Hex {
                name,
                source: HexError,
            })?;
        out.push(((hi << 4) | lo) as u8);
    }
    Ok(out)
}

/// BGP message type, as carried in the header's one-byte type field.
///
/// A type outside the five known values is not a framing error: the
/// message is still delivered (as `Unknown`) so the scenario can observe
/// that the peer sent something unexpected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageType {
    Open,
    Update,
    Notification,
    Keepalive,
    RouteRefresh,
    Unknown(u8),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
enum KnownMessageType {
    Open = 1,
    Update = 2,
    Notification = 3,
    Keepalive = 4,
    RouteRefresh = 5,
}

impl MessageType {
    #[must_use]
    pub fn from_u8(b: u8) -> Self {
        match KnownMessageType::from_u8(b) {
            Some(KnownMessageType::Open) => Self::Open,
            Some(KnownMessageType::Update) => Self::Update,
            Some(KnownMessageType::Notification) => Self::Notification,
            Some(KnownMessageType::Keepalive) => Self::Keepalive,
            Some(KnownMessageType::RouteRefresh) => Self::RouteRefresh,
            None => Self::Unknown(b),
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Open => 1,
            Self::Update => 2,
            Self::Notification => 3,
            Self::Keepalive => 4,
            Self::RouteRefresh => 5,
            Self::Unknown(b) => b,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Update => write!(f, "UPDATE"),
            Self::Notification => write!(f, "NOTIFICATION"),
            Self::Keepalive => write!(f, "KEEPALIVE"),
            Self::RouteRefresh => write!(f, "ROUTE-REFRESH"),
            Self::Unknown(b) => write!(f, "UNKNOWN({b})"),
        }
    }
}

/// A BGP message as received from the wire.
///
/// `body` is the payload following the 19-byte header, kept opaque. Only
/// `msg_type` is examined by the scenario interpreter's matching logic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BgpMessage {
    pub msg_type: MessageType,
    pub body: bytes::Bytes,
}

impl BgpMessage {
    /// Best-effort human-readable summary of the message for logging.
    ///
    /// Never fails: a body too short for the type's fixed fields is
    /// reported as such rather than treated as an error.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.msg_type {
            MessageType::Open if self.body.len() >= 10 => {
                let version = self.body[0];
                let asn = u16::from_be_bytes([self.body[1], self.body[2]]);
                let hold_time = u16::from_be_bytes([self.body[3], self.body[4]]);
                let bgp_id = std::net::Ipv4Addr::new(
                    self.body[5],
                    self.body[6],
                    self.body[7],
                    self.body[8],
                );
                format!(
                    "OPEN version={version} asn={asn} hold_time={hold_time} bgp_id={bgp_id}"
                )
            }
            MessageType::Notification if self.body.len() >= 2 => {
                format!(
                    "NOTIFICATION code={} subcode={}",
                    self.body[0], self.body[1]
                )
            }
            MessageType::RouteRefresh if self.body.len() >= 4 => {
                let afi = u16::from_be_bytes([self.body[0], self.body[1]]);
                let safi = self.body[3];
                format!("ROUTE-REFRESH afi={afi} safi={safi}")
            }
            other => format!("{other} body={} bytes", self.body.len()),
        }
    }
}
