//! Normalized representation of a parsed share-link.
//!
//! Transport and security settings are enums whose variants carry exactly the
//! fields that apply to them, so `network` and `security` always agree with the
//! settings a node holds.

use crate::classify::ProtocolTag;

/// Values used when a link leaves an optional field out.
pub mod defaults {
  use super::KcpTuning;

  pub const NETWORK: &str = "tcp";
  pub const SECURITY: &str = "none";
  /// Trojan without a `security` parameter is TLS in every mainstream client.
  pub const TROJAN_SECURITY: &str = "tls";
  pub const PATH: &str = "/";
  pub const HEADER_TYPE: &str = "none";
  pub const VMESS_CIPHER: &str = "auto";
  pub const VLESS_ENCRYPTION: &str = "none";
  pub const QUIC_SECURITY: &str = "none";
  pub const REALITY_FINGERPRINT: &str = "chrome";
  pub const REALITY_SPIDER_X: &str = "/";

  pub const KCP: KcpTuning = KcpTuning {
    mtu: 1350,
    tti: 50,
    uplink_capacity: 5,
    downlink_capacity: 20,
    congestion: false,
    read_buffer_size: 2,
    write_buffer_size: 2,
  };

  /// Shadowsocks ciphers the engine implements.
  pub const SS_METHODS: &[&str] = &[
    "aes-128-gcm",
    "aes-256-gcm",
    "chacha20-poly1305",
    "chacha20-ietf-poly1305",
    "xchacha20-poly1305",
    "xchacha20-ietf-poly1305",
    "2022-blake3-aes-128-gcm",
    "2022-blake3-aes-256-gcm",
    "2022-blake3-chacha20-poly1305",
    "none",
    "plain",
  ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
  Tcp,
  Ws,
  Grpc,
  HttpUpgrade,
  Kcp,
  Quic,
  H2,
}

impl Network {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "tcp" | "raw" => Some(Network::Tcp),
      "ws" | "websocket" => Some(Network::Ws),
      "grpc" | "gun" => Some(Network::Grpc),
      "httpupgrade" => Some(Network::HttpUpgrade),
      "kcp" | "mkcp" => Some(Network::Kcp),
      "quic" => Some(Network::Quic),
      "h2" | "http" => Some(Network::H2),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Network::Tcp => "tcp",
      Network::Ws => "ws",
      Network::Grpc => "grpc",
      Network::HttpUpgrade => "httpupgrade",
      Network::Kcp => "kcp",
      Network::Quic => "quic",
      Network::H2 => "h2",
    }
  }
}

/// Protocol specific account data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
  Vmess {
    id: String,
    security: String,
    /// Legacy `aid`. Parsed for validation only; modern servers require 0.
    legacy_alter_id: Option<u32>,
  },
  Vless {
    id: String,
    encryption: String,
    flow: Option<String>,
  },
  Trojan {
    password: String,
  },
  Shadowsocks {
    method: String,
    password: String,
  },
}

impl Credential {
  pub fn protocol(&self) -> ProtocolTag {
    match self {
      Credential::Vmess { .. } => ProtocolTag::Vmess,
      Credential::Vless { .. } => ProtocolTag::Vless,
      Credential::Trojan { .. } => ProtocolTag::Trojan,
      Credential::Shadowsocks { .. } => ProtocolTag::Shadowsocks,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TcpHeader {
  None,
  Http { host: Vec<String>, path: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KcpTuning {
  pub mtu: u32,
  pub tti: u32,
  pub uplink_capacity: u32,
  pub downlink_capacity: u32,
  pub congestion: bool,
  pub read_buffer_size: u32,
  pub write_buffer_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
  Tcp {
    header: TcpHeader,
  },
  Ws {
    path: String,
    host: String,
  },
  Grpc {
    service_name: String,
    multi_mode: bool,
  },
  HttpUpgrade {
    path: String,
    host: String,
  },
  Kcp {
    tuning: KcpTuning,
    header_type: String,
    seed: Option<String>,
  },
  Quic {
    security: String,
    key: String,
    header_type: String,
  },
  H2 {
    host: Vec<String>,
    path: String,
  },
}

impl Transport {
  pub fn network(&self) -> Network {
    match self {
      Transport::Tcp { .. } => Network::Tcp,
      Transport::Ws { .. } => Network::Ws,
      Transport::Grpc { .. } => Network::Grpc,
      Transport::HttpUpgrade { .. } => Network::HttpUpgrade,
      Transport::Kcp { .. } => Network::Kcp,
      Transport::Quic { .. } => Network::Quic,
      Transport::H2 { .. } => Network::H2,
    }
  }

  /// Plain TCP with no header obfuscation.
  pub fn plain_tcp() -> Self {
    Transport::Tcp {
      header: TcpHeader::None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
  pub server_name: String,
  pub fingerprint: Option<String>,
  pub allow_insecure: bool,
  pub alpn: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealitySettings {
  pub server_name: String,
  pub fingerprint: String,
  /// Never empty; enforced when the node is parsed.
  pub public_key: String,
  pub short_id: String,
  pub spider_x: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Security {
  None,
  Tls(TlsSettings),
  Reality(RealitySettings),
}

impl Security {
  pub fn as_str(&self) -> &'static str {
    match self {
      Security::None => "none",
      Security::Tls(_) => "tls",
      Security::Reality(_) => "reality",
    }
  }
}

/// One share-link, parsed and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNode {
  /// Display name from the link label; falls back to the server address.
  pub remark: String,
  pub address: String,
  pub port: u16,
  pub credential: Credential,
  pub transport: Transport,
  pub security: Security,
}

impl ParsedNode {
  pub fn protocol(&self) -> ProtocolTag {
    self.credential.protocol()
  }

  pub fn network(&self) -> Network {
    self.transport.network()
  }
}
