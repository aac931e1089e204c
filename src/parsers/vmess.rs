//! `vmess://base64(json)` links in the v2rayN share format.

use base64::engine::general_purpose;
use base64::Engine;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::classify::split_scheme;
use crate::decode::decode_base64_text;
use crate::error::LinkError;
use crate::node::{defaults, Credential, Network, ParsedNode};

use super::{parse_port, validate_user_id, LinkParams};

/// A JSON scalar kept in the representation the link used, so a decoded link
/// serializes back to the same JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
  Str(String),
  Int(i64),
  Float(f64),
  Bool(bool),
}

impl Scalar {
  pub fn text(&self) -> String {
    match self {
      Scalar::Str(s) => s.trim().to_string(),
      Scalar::Int(n) => n.to_string(),
      Scalar::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
      Scalar::Float(f) => f.to_string(),
      Scalar::Bool(b) => b.to_string(),
    }
  }
}

/// The v2rayN JSON object carried in a VMess link. Keys the parser does not
/// use are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmessLink {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub v: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ps: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub add: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub port: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub aid: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub scy: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub net: Option<Scalar>,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub header_type: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub host: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tls: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sni: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub alpn: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fp: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pbk: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sid: Option<Scalar>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub spx: Option<Scalar>,
  #[serde(flatten)]
  pub extra: Map<String, JsonValue>,
}

fn text(v: &Option<Scalar>) -> Option<String> {
  v.as_ref().map(Scalar::text).filter(|s| !s.is_empty())
}

fn required(v: &Option<Scalar>, field: &str) -> Result<String, LinkError> {
  match v {
    None => Err(LinkError::missing(field)),
    Some(s) => {
      let t = s.text();
      if t.is_empty() {
        Err(LinkError::empty(field))
      } else {
        Ok(t)
      }
    }
  }
}

impl VmessLink {
  /// Decodes the base64 JSON body of a `vmess://` link.
  pub fn decode(link: &str) -> Result<Self, LinkError> {
    let (_, body) = split_scheme(link).ok_or_else(|| LinkError::missing("scheme"))?;
    let json_text = decode_base64_text(body.trim())
      .ok_or_else(|| LinkError::encoding("vmess body is not valid base64"))?;
    serde_json::from_str(&json_text)
      .map_err(|e| LinkError::malformed(format!("vmess body is not a JSON object: {e}")))
  }

  /// Re-encodes into a `vmess://` link.
  pub fn to_link(&self) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(self)?;
    Ok(format!("vmess://{}", general_purpose::STANDARD.encode(json)))
  }

  fn extra_text(&self, key: &str) -> Option<String> {
    match self.extra.get(key)? {
      JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
      _ => None,
    }
  }

  /// Maps the v2rayN keys onto the common parameter set. v2rayN reuses
  /// `type`, `host` and `path` with transport-specific meanings.
  fn params(&self) -> LinkParams {
    let network = text(&self.net);
    let header_type = text(&self.header_type);
    let host = text(&self.host);
    let path = text(&self.path);
    let mut p = LinkParams {
      network: network.clone(),
      security: text(&self.tls),
      sni: text(&self.sni),
      fingerprint: text(&self.fp),
      alpn: text(&self.alpn),
      public_key: text(&self.pbk),
      short_id: text(&self.sid),
      spider_x: text(&self.spx),
      header_type: header_type.clone(),
      host: host.clone(),
      path: path.clone(),
      ..Default::default()
    };
    if let Some(v) = self.extra.get("allowInsecure") {
      p.allow_insecure = match v {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => Some(super::to_bool(s)),
        JsonValue::Number(n) => Some(n.as_i64() != Some(0)),
        _ => None,
      };
    }

    match network.as_deref().and_then(Network::parse) {
      Some(Network::Grpc) => {
        p.service_name = self.extra_text("serviceName").or(path);
        p.mode = header_type;
      }
      Some(Network::Quic) => {
        p.quic_security = host;
        p.key = path;
      }
      _ => {}
    }
    p
  }
}

pub fn parse(link: &str) -> Result<ParsedNode, LinkError> {
  let v = VmessLink::decode(link)?;

  let address = required(&v.add, "add")?;
  let port = parse_port(&required(&v.port, "port")?)?;
  let id = validate_user_id("id", &required(&v.id, "id")?)?;

  let legacy_alter_id = match text(&v.aid) {
    None => None,
    Some(raw) => Some(
      raw
        .parse::<u32>()
        .map_err(|_| LinkError::malformed(format!("`aid` must be an integer, got `{raw}`")))?,
    ),
  };
  if let Some(aid) = legacy_alter_id.filter(|a| *a > 0) {
    warn!("vmess link for {address}:{port} sets legacy alterId {aid}; emitting alterId 0 (AEAD)");
  }

  let params = v.params();
  let transport = params.transport(&address)?;
  let security = params.security(&address, defaults::SECURITY)?;

  Ok(ParsedNode {
    remark: text(&v.ps).unwrap_or_else(|| address.clone()),
    credential: Credential::Vmess {
      id,
      security: text(&v.scy).unwrap_or_else(|| defaults::VMESS_CIPHER.to_string()),
      legacy_alter_id,
    },
    address,
    port,
    transport,
    security,
  })
}
