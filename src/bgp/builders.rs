//! Message builders.
//!
//! Each function here materialises one scripted step's parameter into a
//! complete, framed wire message. Capability and path-attribute bytes are
//! copied through as opaque TLVs: a builder never requires them to
//! describe a capability or attribute it otherwise understands, so a
//! scenario can inject structurally valid but semantically nonsensical
//! messages on purpose.

// SPDX-License-Identifier: AGPL-3.0-or-later

use super::{Error, MARKER};
use crate::scenario::{LocalConfig, NotificationParam, OpenParam, RouteRefreshParam, UpdateParam};
use bytes::{BufMut, BytesMut};

fn wrap(msg_type: u8, body: &[u8]) -> Result<Vec<u8>, Error> {
    let total_len = 19 + body.len();
    let total_len =
        u16::try_from(total_len).map_err(|_| Error::LengthOverflow("message"))?;
    let mut out = BytesMut::with_capacity(total_len as usize);
    out.put_slice(&MARKER);
    out.put_u16(total_len);
    out.put_u8(msg_type);
    out.put_slice(body);
    Ok(out.to_vec())
}

/// Serialise a scripted OPEN, overlaying the session's local configuration
/// onto the scenario-supplied capability list.
pub fn open(param: &OpenParam, local: &LocalConfig) -> Result<Vec<u8>, Error> {
    let mut cap_blob = BytesMut::new();
    for cap in &param.capabilities {
        cap_blob.put_u8(cap.code);
        let len = u8::try_from(cap.value.len())
            .map_err(|_| Error::LengthOverflow("capability value"))?;
        cap_blob.put_u8(len);
        cap_blob.put_slice(&cap.value);
    }
    let mut opt_params = BytesMut::new();
    if !cap_blob.is_empty() {
        opt_params.put_u8(2); // optional parameter type: Capabilities
        let len = u8::try_from(cap_blob.len())
            .map_err(|_| Error::LengthOverflow("capabilities"))?;
        opt_params.put_u8(len);
        opt_params.put_slice(&cap_blob);
    }

    let mut body = BytesMut::new();
    body.put_u8(super::BGP_VERSION);
    body.put_u16(local.asn);
    body.put_u16(local.holdtime);
    body.put_slice(&local.id.octets());
    let opt_params_len = u8::try_from(opt_params.len())
        .map_err(|_| Error::LengthOverflow("optional parameters"))?;
    body.put_u8(opt_params_len);
    body.put_slice(&opt_params);

    wrap(1, &body)
}

/// Serialise a scripted UPDATE. Withdrawn-routes-length and
/// total-path-attribute-length are always recomputed from the actual
/// encoded size; a scenario that wants a deliberately wrong length field
/// should use [`raw`] instead.
pub fn update(param: &UpdateParam) -> Result<Vec<u8>, Error> {
    let mut withdrawn = BytesMut::new();
    for cidr in &param.withdrawn {
        withdrawn.put_slice(&cidr.encoded());
    }

    let mut path_attrs = BytesMut::new();
    for attr in &param.path_attrs {
        path_attrs.put_u8(attr.flag);
        path_attrs.put_u8(attr.typ);
        if attr.flag & 0x10 != 0 {
            let len = u16::try_from(attr.value.len())
                .map_err(|_| Error::LengthOverflow("path attribute value"))?;
            path_attrs.put_u16(len);
        } else {
            let len = u8::try_from(attr.value.len())
                .map_err(|_| Error::LengthOverflow("path attribute value"))?;
            path_attrs.put_u8(len);
        }
        path_attrs.put_slice(&attr.value);
    }

    let mut nlri = BytesMut::new();
    for cidr in &param.nlri {
        nlri.put_slice(&cidr.encoded());
    }

    let mut body = BytesMut::new();
    let withdrawn_len = u16::try_from(withdrawn.len())
        .map_err(|_| Error::LengthOverflow("withdrawn routes"))?;
    body.put_u16(withdrawn_len);
    body.put_slice(&withdrawn);
    let path_attrs_len = u16::try_from(path_attrs.len())
        .map_err(|_| Error::LengthOverflow("path attributes"))?;
    body.put_u16(path_attrs_len);
    body.put_slice(&path_attrs);
    body.put_slice(&nlri);

    wrap(2, &body)
}

pub fn notification(param: &NotificationParam) -> Result<Vec<u8>, Error> {
    wrap(3, &[param.code, param.subcode])
}

/// The canonical 19-byte KEEPALIVE: header only, no body.
pub fn keepalive() -> Result<Vec<u8>, Error> {
    wrap(4, &[])
}

pub fn route_refresh(param: &RouteRefreshParam) -> Result<Vec<u8>, Error> {
    let mut body = BytesMut::new();
    body.put_u16(param.afi);
    body.put_u8(0); // reserved
    body.put_u8(param.safi);
    wrap(5, &body)
}

/// Write scripted bytes verbatim, bypassing framing entirely.
#[must_use]
pub fn raw(bytes: &[u8]) -> Vec<u8> {
    bytes.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{PathAttr, RawCapability};
    use std::net::Ipv4Addr;

    fn local() -> LocalConfig {
        LocalConfig {
            holdtime: 180,
            asn: 65000,
            id: Ipv4Addr::new(10, 0, 0, 1),
        }
    }

    #[test]
    fn keepalive_is_exactly_19_bytes() {
        let msg = keepalive().unwrap();
        assert_eq!(msg.len(), 19);
        assert_eq!(&msg[0..16], &MARKER);
        assert_eq!(&msg[16..18], &19u16.to_be_bytes());
        assert_eq!(msg[18], 4);
    }

    #[test]
    fn open_without_capabilities_overlays_local_config() {
        let msg = open(&OpenParam::default(), &local()).unwrap();
        assert_eq!(&msg[0..16], &MARKER);
        assert_eq!(msg[18], 1);
        assert_eq!(msg[19], super::super::BGP_VERSION);
        assert_eq!(u16::from_be_bytes([msg[20], msg[21]]), 65000);
        assert_eq!(u16::from_be_bytes([msg[22], msg[23]]), 180);
        assert_eq!(&msg[24..28], &[10, 0, 0, 1]);
        assert_eq!(msg[28], 0); // opt-param-length
    }

    #[test]
    fn open_with_two_capabilities_has_expected_opt_param_length() {
        let param = OpenParam {
            capabilities: vec![
                RawCapability {
                    code: 1,
                    value: vec![0x00, 0x01, 0x00, 0x01, 0x00],
                },
                RawCapability {
                    code: 65,
                    value: vec![0x00, 0x00, 0xfd, 0xe8],
                },
            ],
        };
        let msg = open(&param, &local()).unwrap();
        // opt-param-length field
        assert_eq!(msg[28], 15);
        assert_eq!(msg[29], 2); // optional parameter type: capabilities
        assert_eq!(msg[30], 13); // capability blob length
        assert_eq!(msg[31], 1); // first capability code
        assert_eq!(msg[32], 5); // first capability length
        assert_eq!(&msg[33..38], &[0x00, 0x01, 0x00, 0x01, 0x00]);
        assert_eq!(msg[38], 65);
        assert_eq!(msg[39], 4);
        assert_eq!(&msg[40..44], &[0x00, 0x00, 0xfd, 0xe8]);
        assert_eq!(msg.len(), 19 + 10 + 15);
    }

    #[test]
    fn update_recomputes_lengths_from_actual_content() {
        let param = UpdateParam {
            withdrawn: vec!["10.0.0.0/8".parse().unwrap()],
            path_attrs: vec![PathAttr {
                flag: 0x40,
                typ: 1,
                value: vec![0],
            }],
            nlri: vec!["192.168.0.0/16".parse().unwrap()],
        };
        let msg = update(&param).unwrap();
        assert_eq!(u16::from_be_bytes([msg[19], msg[20]]), 2); // withdrawn len
        assert_eq!(msg[21], 8); // withdrawn prefix_len
        assert_eq!(msg[22], 10); // withdrawn prefix octet
        let tpa_len = u16::from_be_bytes([msg[23], msg[24]]);
        assert_eq!(tpa_len, 4); // flag+type+len+1-byte value
        assert_eq!(msg[25], 0x40);
        assert_eq!(msg[26], 1);
        assert_eq!(msg[27], 1);
        assert_eq!(msg[28], 0);
        assert_eq!(msg[29], 16); // nlri prefix_len
        assert_eq!(&msg[30..32], &[192, 168]);
    }

    #[test]
    fn extended_length_flag_uses_two_byte_length_field() {
        let param = UpdateParam {
            path_attrs: vec![PathAttr {
                flag: 0x50, // 0x40 | extended-length bit 0x10
                typ: 2,
                value: vec![0xaa; 300],
            }],
            ..Default::default()
        };
        let msg = update(&param).unwrap();
        // withdrawn len (2) = 0
        let tpa_len = u16::from_be_bytes([msg[23], msg[24]]);
        assert_eq!(tpa_len, 2 + 2 + 300);
        assert_eq!(msg[25], 0x50);
        assert_eq!(msg[26], 2);
        assert_eq!(u16::from_be_bytes([msg[27], msg[28]]), 300);
    }

    #[test]
    fn raw_is_passed_through_unmodified() {
        let bytes = vec![1, 2, 3, 4, 5];
        assert_eq!(raw(&bytes), bytes);
    }

    #[test]
    fn route_refresh_encodes_afi_reserved_safi() {
        let param = RouteRefreshParam { afi: 1, safi: 1 };
        let msg = route_refresh(&param).unwrap();
        assert_eq!(msg.len(), 23);
        assert_eq!(u16::from_be_bytes([msg[19], msg[20]]), 1);
        assert_eq!(msg[21], 0);
        assert_eq!(msg[22], 1);
    }
}
