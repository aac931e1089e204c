//! Xray outbound documents and the mapping from [`ParsedNode`] onto them.

use serde::Serialize;

use crate::classify::ProtocolTag;
use crate::node::{
  Credential, KcpTuning, ParsedNode, RealitySettings, Security, TcpHeader, TlsSettings, Transport,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundConfig {
  pub tag: String,
  pub protocol: ProtocolTag,
  pub settings: OutboundSettings,
  #[serde(rename = "streamSettings")]
  pub stream_settings: StreamSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutboundSettings {
  Vnext { vnext: Vec<VnextServer> },
  Servers { servers: Vec<Server> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VnextServer {
  pub address: String,
  pub port: u16,
  pub users: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum User {
  Vmess {
    id: String,
    #[serde(rename = "alterId")]
    alter_id: u32,
    security: String,
    level: u32,
  },
  Vless {
    id: String,
    encryption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    flow: Option<String>,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Server {
  Trojan {
    address: String,
    port: u16,
    password: String,
  },
  Shadowsocks {
    address: String,
    port: u16,
    method: String,
    password: String,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSettings {
  pub network: &'static str,
  pub security: &'static str,
  #[serde(flatten)]
  pub security_settings: Option<SecuritySettings>,
  #[serde(flatten)]
  pub transport_settings: TransportSettings,
}

/// Serialized as exactly one `tlsSettings` or `realitySettings` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SecuritySettings {
  #[serde(rename = "tlsSettings")]
  Tls(TlsOut),
  #[serde(rename = "realitySettings")]
  Reality(RealityOut),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsOut {
  pub server_name: String,
  pub allow_insecure: bool,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub alpn: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealityOut {
  pub server_name: String,
  pub fingerprint: String,
  pub public_key: String,
  pub short_id: String,
  pub spider_x: String,
}

/// Serialized as exactly one `<network>Settings` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransportSettings {
  #[serde(rename = "tcpSettings")]
  Tcp(TcpOut),
  #[serde(rename = "wsSettings")]
  Ws(PathHostOut),
  #[serde(rename = "grpcSettings")]
  Grpc(GrpcOut),
  #[serde(rename = "httpupgradeSettings")]
  HttpUpgrade(PathHostOut),
  #[serde(rename = "kcpSettings")]
  Kcp(KcpOut),
  #[serde(rename = "quicSettings")]
  Quic(QuicOut),
  #[serde(rename = "httpSettings")]
  H2(HttpOut),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderType {
  #[serde(rename = "type")]
  pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TcpOut {
  pub header: TcpHeaderOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TcpHeaderOut {
  None,
  Http { request: HttpRequestOut },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpRequestOut {
  pub path: Vec<String>,
  pub headers: HttpHeadersOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpHeadersOut {
  #[serde(rename = "Host")]
  pub host: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathHostOut {
  pub path: String,
  pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrpcOut {
  pub service_name: String,
  pub multi_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KcpOut {
  pub mtu: u32,
  pub tti: u32,
  pub uplink_capacity: u32,
  pub downlink_capacity: u32,
  pub congestion: bool,
  pub read_buffer_size: u32,
  pub write_buffer_size: u32,
  pub header: HeaderType,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub seed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuicOut {
  pub security: String,
  pub key: String,
  pub header: HeaderType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpOut {
  pub host: Vec<String>,
  pub path: String,
}

fn settings(node: &ParsedNode) -> OutboundSettings {
  let address = node.address.clone();
  let port = node.port;
  match &node.credential {
    Credential::Vmess { id, security, .. } => OutboundSettings::Vnext {
      vnext: vec![VnextServer {
        address,
        port,
        users: vec![User::Vmess {
          id: id.clone(),
          alter_id: 0,
          security: security.clone(),
          level: 0,
        }],
      }],
    },
    Credential::Vless {
      id,
      encryption,
      flow,
    } => OutboundSettings::Vnext {
      vnext: vec![VnextServer {
        address,
        port,
        users: vec![User::Vless {
          id: id.clone(),
          encryption: encryption.clone(),
          flow: flow.clone(),
        }],
      }],
    },
    Credential::Trojan { password } => OutboundSettings::Servers {
      servers: vec![Server::Trojan {
        address,
        port,
        password: password.clone(),
      }],
    },
    Credential::Shadowsocks { method, password } => OutboundSettings::Servers {
      servers: vec![Server::Shadowsocks {
        address,
        port,
        method: method.clone(),
        password: password.clone(),
      }],
    },
  }
}

fn security_settings(security: &Security) -> Option<SecuritySettings> {
  match security {
    Security::None => None,
    Security::Tls(TlsSettings {
      server_name,
      fingerprint,
      allow_insecure,
      alpn,
    }) => Some(SecuritySettings::Tls(TlsOut {
      server_name: server_name.clone(),
      allow_insecure: *allow_insecure,
      alpn: alpn.clone(),
      fingerprint: fingerprint.clone(),
    })),
    Security::Reality(RealitySettings {
      server_name,
      fingerprint,
      public_key,
      short_id,
      spider_x,
    }) => Some(SecuritySettings::Reality(RealityOut {
      server_name: server_name.clone(),
      fingerprint: fingerprint.clone(),
      public_key: public_key.clone(),
      short_id: short_id.clone(),
      spider_x: spider_x.clone(),
    })),
  }
}

fn header(kind: &str) -> HeaderType {
  HeaderType {
    kind: kind.to_string(),
  }
}

fn kcp(tuning: &KcpTuning, header_type: &str, seed: &Option<String>) -> KcpOut {
  KcpOut {
    mtu: tuning.mtu,
    tti: tuning.tti,
    uplink_capacity: tuning.uplink_capacity,
    downlink_capacity: tuning.downlink_capacity,
    congestion: tuning.congestion,
    read_buffer_size: tuning.read_buffer_size,
    write_buffer_size: tuning.write_buffer_size,
    header: header(header_type),
    seed: seed.clone(),
  }
}

fn transport_settings(transport: &Transport) -> TransportSettings {
  match transport {
    Transport::Tcp { header } => TransportSettings::Tcp(TcpOut {
      header: match header {
        TcpHeader::None => TcpHeaderOut::None,
        TcpHeader::Http { host, path } => TcpHeaderOut::Http {
          request: HttpRequestOut {
            path: path.clone(),
            headers: HttpHeadersOut { host: host.clone() },
          },
        },
      },
    }),
    Transport::Ws { path, host } => TransportSettings::Ws(PathHostOut {
      path: path.clone(),
      host: host.clone(),
    }),
    Transport::Grpc {
      service_name,
      multi_mode,
    } => TransportSettings::Grpc(GrpcOut {
      service_name: service_name.clone(),
      multi_mode: *multi_mode,
    }),
    Transport::HttpUpgrade { path, host } => TransportSettings::HttpUpgrade(PathHostOut {
      path: path.clone(),
      host: host.clone(),
    }),
    Transport::Kcp {
      tuning,
      header_type,
      seed,
    } => TransportSettings::Kcp(kcp(tuning, header_type, seed)),
    Transport::Quic {
      security,
      key,
      header_type,
    } => TransportSettings::Quic(QuicOut {
      security: security.clone(),
      key: key.clone(),
      header: header(header_type),
    }),
    Transport::H2 { host, path } => TransportSettings::H2(HttpOut {
      host: host.clone(),
      path: path.clone(),
    }),
  }
}

/// Builds the outbound for a parsed node. Total: every node maps to exactly one
/// outbound shape.
pub fn synthesize(node: &ParsedNode) -> OutboundConfig {
  OutboundConfig {
    tag: format!("outbound_{}", node.remark),
    protocol: node.protocol(),
    settings: settings(node),
    stream_settings: StreamSettings {
      network: node.network().as_str(),
      security: node.security.as_str(),
      security_settings: security_settings(&node.security),
      transport_settings: transport_settings(&node.transport),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::defaults;
  use serde_json::json;

  fn node(credential: Credential, transport: Transport, security: Security) -> ParsedNode {
    ParsedNode {
      remark: "n".into(),
      address: "1.2.3.4".into(),
      port: 443,
      credential,
      transport,
      security,
    }
  }

  fn vless() -> Credential {
    Credential::Vless {
      id: "uuid".into(),
      encryption: "none".into(),
      flow: None,
    }
  }

  #[test]
  fn test_synthesize_vless_reality() {
    let n = node(
      vless(),
      Transport::plain_tcp(),
      Security::Reality(RealitySettings {
        server_name: "www.microsoft.com".into(),
        fingerprint: "chrome".into(),
        public_key: "KEY".into(),
        short_id: "ab".into(),
        spider_x: "/".into(),
      }),
    );
    let v = serde_json::to_value(synthesize(&n)).unwrap();
    assert_eq!(
      v,
      json!({
        "tag": "outbound_n",
        "protocol": "vless",
        "settings": {"vnext": [{"address": "1.2.3.4", "port": 443,
          "users": [{"id": "uuid", "encryption": "none"}]}]},
        "streamSettings": {
          "network": "tcp",
          "security": "reality",
          "realitySettings": {"serverName": "www.microsoft.com", "fingerprint": "chrome",
            "publicKey": "KEY", "shortId": "ab", "spiderX": "/"},
          "tcpSettings": {"header": {"type": "none"}}
        }
      })
    );
  }

  #[test]
  fn test_synthesize_vmess_always_emits_zero_alter_id() {
    let n = node(
      Credential::Vmess {
        id: "uuid".into(),
        security: "auto".into(),
        legacy_alter_id: Some(64),
      },
      Transport::Ws {
        path: "/vm".into(),
        host: "cdn.example".into(),
      },
      Security::Tls(TlsSettings {
        server_name: "cdn.example".into(),
        fingerprint: Some("chrome".into()),
        allow_insecure: false,
        alpn: vec![],
      }),
    );
    let v = serde_json::to_value(synthesize(&n)).unwrap();
    assert_eq!(
      v["settings"]["vnext"][0]["users"][0],
      json!({"id": "uuid", "alterId": 0, "security": "auto", "level": 0})
    );
    assert_eq!(v["streamSettings"]["wsSettings"], json!({"path": "/vm", "host": "cdn.example"}));
    assert_eq!(
      v["streamSettings"]["tlsSettings"],
      json!({"serverName": "cdn.example", "allowInsecure": false, "fingerprint": "chrome"})
    );
    assert!(v["streamSettings"].get("realitySettings").is_none());
  }

  #[test]
  fn test_synthesize_trojan_and_shadowsocks_servers() {
    let t = node(Credential::Trojan { password: "pw".into() }, Transport::plain_tcp(), Security::None);
    let v = serde_json::to_value(synthesize(&t)).unwrap();
    assert_eq!(v["settings"], json!({"servers": [{"address": "1.2.3.4", "port": 443, "password": "pw"}]}));
    assert_eq!(v["streamSettings"]["security"], "none");
    assert!(v["streamSettings"].get("tlsSettings").is_none());

    let s = node(
      Credential::Shadowsocks {
        method: "aes-128-gcm".into(),
        password: "pw".into(),
      },
      Transport::plain_tcp(),
      Security::None,
    );
    let v = serde_json::to_value(synthesize(&s)).unwrap();
    assert_eq!(v["protocol"], "shadowsocks");
    assert_eq!(
      v["settings"]["servers"][0],
      json!({"address": "1.2.3.4", "port": 443, "method": "aes-128-gcm", "password": "pw"})
    );
  }

  #[test]
  fn test_synthesize_transport_keys() {
    let cases = vec![
      (
        Transport::Grpc {
          service_name: "svc".into(),
          multi_mode: true,
        },
        "grpcSettings",
        json!({"serviceName": "svc", "multiMode": true}),
      ),
      (
        Transport::HttpUpgrade {
          path: "/u".into(),
          host: "h".into(),
        },
        "httpupgradeSettings",
        json!({"path": "/u", "host": "h"}),
      ),
      (
        Transport::Kcp {
          tuning: defaults::KCP,
          header_type: "wechat-video".into(),
          seed: Some("s".into()),
        },
        "kcpSettings",
        json!({"mtu": 1350, "tti": 50, "uplinkCapacity": 5, "downlinkCapacity": 20,
          "congestion": false, "readBufferSize": 2, "writeBufferSize": 2,
          "header": {"type": "wechat-video"}, "seed": "s"}),
      ),
      (
        Transport::Quic {
          security: "none".into(),
          key: "".into(),
          header_type: "none".into(),
        },
        "quicSettings",
        json!({"security": "none", "key": "", "header": {"type": "none"}}),
      ),
      (
        Transport::H2 {
          host: vec!["a".into()],
          path: "/".into(),
        },
        "httpSettings",
        json!({"host": ["a"], "path": "/"}),
      ),
      (
        Transport::Tcp {
          header: TcpHeader::Http {
            host: vec!["a".into()],
            path: vec!["/".into()],
          },
        },
        "tcpSettings",
        json!({"header": {"type": "http", "request": {"path": ["/"], "headers": {"Host": ["a"]}}}}),
      ),
    ];

    for (transport, key, expected) in cases {
      let network = transport.network().as_str();
      let v = serde_json::to_value(synthesize(&node(vless(), transport, Security::None))).unwrap();
      let stream = v["streamSettings"].as_object().unwrap();
      assert_eq!(stream["network"], network);
      assert_eq!(stream[key], expected, "{key}");
      let settings_keys = stream.keys().filter(|k| k.ends_with("Settings")).count();
      assert_eq!(settings_keys, 1, "{key}");
    }
  }
}
