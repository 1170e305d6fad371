//! CIDR blocks, as used for withdrawn routes and NLRI.

// SPDX-License-Identifier: AGPL-3.0-or-later

use super::Error;
use bytes::{BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 CIDR block, e.g. `10.0.0.0/8`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cidr4 {
    pub addr: Ipv4Addr,
    pub prefix_len: u8,
}

impl FromStr for Cidr4 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix_len) = s.split_once('/').ok_or_else(|| Error::Cidr(s.to_owned()))?;
        let addr: Ipv4Addr = addr.parse().map_err(|_| Error::Cidr(s.to_owned()))?;
        let prefix_len: u8 = prefix_len.parse().map_err(|_| Error::Cidr(s.to_owned()))?;
        if prefix_len > 32 {
            return Err(Error::Cidr(s.to_owned()));
        }
        Ok(Self { addr, prefix_len })
    }
}

/// Number of octets needed to carry a prefix of the given length.
#[must_use]
pub fn n_prefix_octets(prefix_len: u8) -> usize {
    #[allow(clippy::verbose_bit_mask)]
    let result = if prefix_len & 0x07 == 0 {
        prefix_len >> 3
    } else {
        (prefix_len >> 3) + 1
    };
    usize::from(result)
}

impl Cidr4 {
    /// Encode as the compact `(prefix_len, prefix)` NLRI representation
    /// used for withdrawn routes and reachable NLRI.
    ///
    /// `0.0.0.0/0` encodes to a single zero byte with no prefix octets.
    #[must_use]
    pub fn encoded(&self) -> Bytes {
        let n = n_prefix_octets(self.prefix_len);
        let mut dst = BytesMut::with_capacity(1 + n);
        dst.put_u8(self.prefix_len);
        dst.put_slice(&self.addr.octets()[..n]);
        dst.freeze()
    }
}
