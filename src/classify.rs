use std::fmt;

use serde::Serialize;

use crate::error::LinkError;

/// Protocols a share-link can be turned into an outbound for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolTag {
  Vmess,
  Vless,
  Trojan,
  Shadowsocks,
}

impl ProtocolTag {
  /// Name of the protocol as the outbound `protocol` field spells it.
  pub fn as_str(self) -> &'static str {
    match self {
      ProtocolTag::Vmess => "vmess",
      ProtocolTag::Vless => "vless",
      ProtocolTag::Trojan => "trojan",
      ProtocolTag::Shadowsocks => "shadowsocks",
    }
  }

  fn from_scheme(scheme: &str) -> Option<Self> {
    match scheme.to_ascii_lowercase().as_str() {
      "vmess" => Some(ProtocolTag::Vmess),
      "vless" => Some(ProtocolTag::Vless),
      "trojan" => Some(ProtocolTag::Trojan),
      "ss" | "shadowsocks" => Some(ProtocolTag::Shadowsocks),
      _ => None,
    }
  }
}

impl fmt::Display for ProtocolTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Splits `scheme://rest` into its scheme and the remainder.
pub fn split_scheme(link: &str) -> Option<(&str, &str)> {
  let (scheme, rest) = link.trim().split_once("://")?;
  if scheme.is_empty() {
    return None;
  }
  Some((scheme, rest))
}

/// Picks the protocol parser for a link by its scheme prefix (case-insensitive).
pub fn classify(link: &str) -> Result<ProtocolTag, LinkError> {
  let (scheme, _) = split_scheme(link)
    .ok_or_else(|| LinkError::UnknownScheme(format!("no scheme in `{}`", link.trim())))?;
  ProtocolTag::from_scheme(scheme).ok_or_else(|| LinkError::UnknownScheme(scheme.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_classify_known_schemes() {
    assert_eq!(classify("vmess://abc").unwrap(), ProtocolTag::Vmess);
    assert_eq!(classify("VLESS://id@h:1").unwrap(), ProtocolTag::Vless);
    assert_eq!(classify("  trojan://p@h:1").unwrap(), ProtocolTag::Trojan);
    assert_eq!(classify("ss://x").unwrap(), ProtocolTag::Shadowsocks);
    assert_eq!(classify("shadowsocks://x").unwrap(), ProtocolTag::Shadowsocks);
  }

  #[test]
  fn test_classify_unknown_scheme() {
    assert_eq!(
      classify("wireguard://key@h:51820"),
      Err(LinkError::UnknownScheme("wireguard".to_string()))
    );
  }

  #[test]
  fn test_classify_missing_scheme() {
    assert!(matches!(classify("just some text"), Err(LinkError::UnknownScheme(_))));
    assert!(matches!(classify("://nohost"), Err(LinkError::UnknownScheme(_))));
  }
}
