//! YAML configuration loading.
//!
//! The document is deserialised once into the `Raw*` structs below, then
//! converted into the typed [`crate::scenario`] model. Everything past
//! [`load`] works with typed data; nothing downstream touches a
//! `serde_yaml::Value` again.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::bgp::{self, cidr::Cidr4};
use crate::scenario::{
    LocalConfig, NothingParam, NotificationParam, OpenParam, PathAttr, PeerConfig, RawCapability,
    RawParam, ReceiveKind, RouteRefreshParam, Scenario, SleepParam, Step, UpdateParam,
};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unknown operation {0:?}")]
    UnknownOperation(String),
    #[error("malformed parameter for operation {ope:?}: {source}")]
    BadParameter {
        ope: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid address {0:?}: expected a dotted-quad IPv4 address")]
    BadAddress(String),
    #[error(transparent)]
    Wire(#[from] bgp::Error),
    #[error("receive_one_of_them alternative at index {0} is not a receive-kind step")]
    OneOfThemNotReceive(usize),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    global: RawGlobal,
    scenario: Vec<RawStep>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGlobal {
    peer_ip: String,
    peer_port: u16,
    holdtime: u16,
    local_as: u16,
    local_id: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStep {
    ope: String,
    #[serde(default)]
    param: serde_yaml::Value,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawOpenParam {
    #[serde(default)]
    capabilities: Vec<RawCapabilityEntry>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCapabilityEntry {
    #[serde(rename = "type")]
    typ: u8,
    value: String,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawUpdateParam {
    #[serde(default)]
    withdrawn_routes: Vec<String>,
    #[serde(default)]
    path_attributes: Vec<RawPathAttrEntry>,
    #[serde(default)]
    nlri: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPathAttrEntry {
    flag: String,
    #[serde(rename = "type")]
    typ: u8,
    value: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNotificationParam {
    code: u8,
    subcode: u8,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRouteRefreshParam {
    afi: u16,
    safi: u8,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRawParam {
    bytes: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSecParam {
    sec: u64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOneOfThemParam {
    opes: Vec<RawStep>,
}

/// The validated global settings, split into their two consumer-facing
/// shapes.
pub struct GlobalConfig {
    pub peer: PeerConfig,
    pub local: LocalConfig,
}

/// Load and fully validate a scenario file from disk.
pub fn load(path: &Path) -> Result<(GlobalConfig, Scenario), Error> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.display().to_string(),
        source,
    })?;
    let doc: RawDocument = serde_yaml::from_str(&text)?;

    let peer_ip: IpAddr = doc
        .global
        .peer_ip
        .parse()
        .map_err(|_| Error::BadAddress(doc.global.peer_ip.clone()))?;
    let local_id: Ipv4Addr = doc
        .global
        .local_id
        .parse()
        .map_err(|_| Error::BadAddress(doc.global.local_id.clone()))?;
    let global = GlobalConfig {
        peer: PeerConfig {
            ip: peer_ip,
            port: doc.global.peer_port,
        },
        local: LocalConfig {
            holdtime: doc.global.holdtime,
            asn: doc.global.local_as,
            id: local_id,
        },
    };

    let steps = parse_steps(doc.scenario)?;
    Ok((global, Scenario(steps)))
}

fn parse_steps(raw: Vec<RawStep>) -> Result<Vec<Step>, Error> {
    raw.into_iter().map(parse_step).collect()
}

fn parse_step(raw: RawStep) -> Result<Step, Error> {
    let bad_param = |ope: &str, source: serde_yaml::Error| Error::BadParameter {
        ope: ope.to_owned(),
        source,
    };

    Ok(match raw.ope.as_str() {
        "connect" => Step::Connect,
        "close" => Step::Close,
        "send_bgp_keepalive" => Step::SendKeepalive,
        "receive_bgp_open" => Step::Receive(ReceiveKind::Open),
        "receive_bgp_update" => Step::Receive(ReceiveKind::Update),
        "receive_bgp_notification" => Step::Receive(ReceiveKind::Notification),
        "receive_bgp_keepalive" => Step::Receive(ReceiveKind::Keepalive),
        "receive_bgp_routerefresh" => Step::Receive(ReceiveKind::RouteRefresh),
        "send_bgp_open" => {
            let p: RawOpenParam = serde_yaml::from_value(raw.param.clone())
                .map_err(|e| bad_param(&raw.ope, e))?;
            let mut capabilities = Vec::with_capacity(p.capabilities.len());
            for cap in p.capabilities {
                let value = bgp::hex_decode("capability value", &cap.value)?;
                capabilities.push(RawCapability {
                    code: cap.typ,
                    value,
                });
            }
            Step::SendOpen(OpenParam { capabilities })
        }
        "send_bgp_update" => {
            let p: RawUpdateParam = serde_yaml::from_value(raw.param.clone())
                .map_err(|e| bad_param(&raw.ope, e))?;
            let withdrawn = parse_cidrs(&p.withdrawn_routes)?;
            let nlri = parse_cidrs(&p.nlri)?;
            let mut path_attrs = Vec::with_capacity(p.path_attributes.len());
            for attr in p.path_attributes {
                let flag_bytes = bgp::hex_decode("path attribute flag", &attr.flag)?;
                let flag = *flag_bytes
                    .first()
                    .ok_or_else(|| bgp::Error::Cidr(attr.flag.clone()))?;
                let value = bgp::hex_decode("path attribute value", &attr.value)?;
                path_attrs.push(PathAttr {
                    flag,
                    typ: attr.typ,
                    value,
                });
            }
            Step::SendUpdate(UpdateParam {
                withdrawn,
                path_attrs,
                nlri,
            })
        }
        "send_bgp_notification" => {
            let p: RawNotificationParam = serde_yaml::from_value(raw.param.clone())
                .map_err(|e| bad_param(&raw.ope, e))?;
            Step::SendNotification(NotificationParam {
                code: p.code,
                subcode: p.subcode,
            })
        }
        "send_bgp_routerefresh" => {
            let p: RawRouteRefreshParam = serde_yaml::from_value(raw.param.clone())
                .map_err(|e| bad_param(&raw.ope, e))?;
            Step::SendRouteRefresh(RouteRefreshParam {
                afi: p.afi,
                safi: p.safi,
            })
        }
        "send_bgp_raw" => {
            let p: RawRawParam =
                serde_yaml::from_value(raw.param.clone()).map_err(|e| bad_param(&raw.ope, e))?;
            let bytes = bgp::hex_decode("raw message bytes", &p.bytes)?;
            Step::SendRaw(RawParam { bytes })
        }
        "sleep" => {
            let p: RawSecParam =
                serde_yaml::from_value(raw.param.clone()).map_err(|e| bad_param(&raw.ope, e))?;
            Step::Sleep(SleepParam { seconds: p.sec })
        }
        "receive_nothing" => {
            let p: RawSecParam =
                serde_yaml::from_value(raw.param.clone()).map_err(|e| bad_param(&raw.ope, e))?;
            Step::ReceiveNothing(NothingParam { seconds: p.sec })
        }
        "receive_one_of_them" => {
            let p: RawOneOfThemParam =
                serde_yaml::from_value(raw.param.clone()).map_err(|e| bad_param(&raw.ope, e))?;
            let alternatives = parse_steps(p.opes)?;
            for (i, step) in alternatives.iter().enumerate() {
                if !matches!(step, Step::Receive(_) | Step::ReceiveNothing(_)) {
                    return Err(Error::OneOfThemNotReceive(i));
                }
            }
            Step::ReceiveOneOfThem(alternatives)
        }
        other => return Err(Error::UnknownOperation(other.to_owned())),
    })
}

fn parse_cidrs(raw: &[String]) -> Result<Vec<Cidr4>, Error> {
    raw.iter()
        .map(|s| s.parse::<Cidr4>().map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(contents: &str) -> tempfile_path::TempPath {
        tempfile_path::TempPath::new(contents)
    }

    mod tempfile_path {
        use std::io::Write;
        use std::path::{Path, PathBuf};
        use std::sync::atomic::{AtomicU32, Ordering};

        static NEXT_ID: AtomicU32 = AtomicU32::new(0);

        pub struct TempPath(PathBuf);

        impl TempPath {
            pub fn new(contents: &str) -> Self {
                let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
                let mut path = std::env::temp_dir();
                path.push(format!("bgp-bully-test-{}-{id}.yaml", std::process::id()));
                let mut file = std::fs::File::create(&path).unwrap();
                file.write_all(contents.as_bytes()).unwrap();
                Self(path)
            }
        }

        impl AsRef<Path> for TempPath {
            fn as_ref(&self) -> &Path {
                &self.0
            }
        }

        impl Drop for TempPath {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.0);
            }
        }
    }

    const MINIMAL: &str = r#"
global:
  peer_ip: "127.0.0.1"
  peer_port: 179
  holdtime: 180
  local_as: 65000
  local_id: "10.0.0.1"
scenario:
  - ope: connect
  - ope: send_bgp_open
    param:
      capabilities:
        - type: 1
          value: "0001000100"
  - ope: receive_bgp_open
  - ope: send_bgp_keepalive
  - ope: receive_one_of_them
    param:
      opes:
        - ope: receive_bgp_notification
        - ope: receive_nothing
          param:
            sec: 5
  - ope: close
"#;

    #[test]
    fn loads_minimal_scenario() {
        let path = write_temp(MINIMAL);
        let (global, scenario) = load(path.as_ref()).unwrap();
        assert_eq!(global.local.asn, 65000);
        assert_eq!(scenario.steps().len(), 6);
        assert!(matches!(scenario.steps()[0], Step::Connect));
        assert!(matches!(scenario.steps()[5], Step::Close));
    }

    #[test]
    fn rejects_unknown_operation() {
        let yaml = MINIMAL.replace("connect", "teleport");
        let path = write_temp(&yaml);
        let err = load(path.as_ref()).unwrap_err();
        assert!(matches!(err, Error::UnknownOperation(_)));
    }

    #[test]
    fn rejects_odd_length_hex() {
        let yaml = MINIMAL.replace("\"0001000100\"", "\"abc\"");
        let path = write_temp(&yaml);
        assert!(load(path.as_ref()).is_err());
    }

    #[test]
    fn rejects_unknown_global_key() {
        let yaml = MINIMAL.replace("holdtime: 180", "holdtime: 180\n  bogus_key: 1");
        let path = write_temp(&yaml);
        assert!(load(path.as_ref()).is_err());
    }

    #[test]
    fn rejects_unknown_param_key() {
        let yaml = MINIMAL.replace(
            "capabilities:\n        - type: 1\n          value: \"0001000100\"",
            "capabilities:\n        - type: 1\n          value: \"0001000100\"\n      bogus_key: 1",
        );
        let path = write_temp(&yaml);
        assert!(load(path.as_ref()).is_err());
    }

    #[test]
    fn one_of_them_rejects_non_receive_alternative() {
        let yaml = MINIMAL.replace("- ope: receive_bgp_notification", "- ope: send_bgp_keepalive");
        let path = write_temp(&yaml);
        let err = load(path.as_ref()).unwrap_err();
        assert!(matches!(err, Error::OneOfThemNotReceive(_)));
    }
}
