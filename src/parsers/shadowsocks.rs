//! Shadowsocks links, in any of the forms found in the wild:
//!
//! - SIP002: `ss://base64(method:password)@host:port[/?plugin=...]#remark`
//! - SIP002 with plain userinfo: `ss://method:password@host:port#remark`
//! - legacy: `ss://base64(method:password@host:port)#remark`

use log::warn;

use crate::classify::split_scheme;
use crate::decode::decode_base64_text;
use crate::error::LinkError;
use crate::node::{defaults, Credential, ParsedNode, Security, Transport};

use super::{decode_query, percent_decode_strict, split_host_port, LinkParams};

fn decode_userinfo(raw: &str) -> Result<String, LinkError> {
  let plain = percent_decode_strict(raw, "userinfo")?;
  if plain.contains(':') {
    return Ok(plain);
  }
  decode_base64_text(&plain)
    .ok_or_else(|| LinkError::encoding("shadowsocks userinfo is not valid base64"))
}

fn split_credentials(userinfo: &str) -> Result<(String, String), LinkError> {
  let (method, password) = userinfo
    .split_once(':')
    .ok_or_else(|| LinkError::malformed("shadowsocks userinfo must be `method:password`"))?;
  let method = method.trim().to_ascii_lowercase();
  if method.is_empty() {
    return Err(LinkError::empty("method"));
  }
  if !defaults::SS_METHODS.contains(&method.as_str()) {
    return Err(LinkError::malformed(format!(
      "unsupported shadowsocks method `{method}`"
    )));
  }
  if password.is_empty() {
    return Err(LinkError::empty("password"));
  }
  Ok((method, password.to_string()))
}

pub fn parse(link: &str) -> Result<ParsedNode, LinkError> {
  let (_, rest) = split_scheme(link).ok_or_else(|| LinkError::missing("scheme"))?;

  let (before_hash, hash) = match rest.split_once('#') {
    Some((a, b)) => (a, Some(b)),
    None => (rest, None),
  };
  let remark = hash
    .map(|h| percent_decode_strict(h, "remark"))
    .transpose()?
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty());

  let (main, query) = match before_hash.split_once('?') {
    Some((a, b)) => (a, Some(b)),
    None => (before_hash, None),
  };
  if let Some(q) = query {
    let params = LinkParams::from_query(decode_query(q)?);
    if let Some(plugin) = params.plugin {
      warn!("ignoring shadowsocks plugin `{plugin}`, the outbound has no plugin support");
    }
  }

  let main = main.trim().trim_end_matches('/');
  if main.is_empty() {
    return Err(LinkError::empty("userinfo"));
  }

  let (userinfo, host_part) = match main.rsplit_once('@') {
    Some((creds, host)) => (decode_userinfo(creds)?, host.to_string()),
    None => {
      let decoded = decode_base64_text(main)
        .ok_or_else(|| LinkError::encoding("shadowsocks link body is not valid base64"))?;
      let (creds, host) = decoded
        .trim()
        .rsplit_once('@')
        .ok_or_else(|| LinkError::missing("host"))?;
      (creds.to_string(), host.to_string())
    }
  };

  let (method, password) = split_credentials(&userinfo)?;
  let (address, port) = split_host_port(&host_part)?;

  Ok(ParsedNode {
    remark: remark.unwrap_or_else(|| address.clone()),
    address,
    port,
    credential: Credential::Shadowsocks { method, password },
    transport: Transport::plain_tcp(),
    security: Security::None,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn creds(node: &ParsedNode) -> (&str, &str) {
    match &node.credential {
      Credential::Shadowsocks { method, password } => (method, password),
      other => panic!("unexpected credential {other:?}"),
    }
  }

  #[test]
  fn test_parse_ss_sip002() {
    let node =
      parse("ss://Y2hhY2hhMjAtaWV0Zi1wb2x5MTMwNTpwYXNzd29yZA==@example.com:8388#Example%20Server")
        .unwrap();
    assert_eq!(node.address, "example.com");
    assert_eq!(node.port, 8388);
    assert_eq!(node.remark, "Example Server");
    assert_eq!(creds(&node), ("chacha20-ietf-poly1305", "password"));
  }

  #[test]
  fn test_parse_ss_sip002_unpadded_with_plugin() {
    let node = parse(
      "ss://Y2hhY2hhMjAtaWV0Zi1wb2x5MTMwNTpwYXNzd29yZA@example.com:8388/?plugin=obfs-local%3Bobfs%3Dhttp#P",
    )
    .unwrap();
    assert_eq!(node.remark, "P");
    assert_eq!(creds(&node), ("chacha20-ietf-poly1305", "password"));
  }

  #[test]
  fn test_parse_ss_legacy() {
    let node = parse("ss://Y2hhY2hhMjAtaWV0Zi1wb2x5MTMwNTpwYXNzd29yZEAxMjcuMC4wLjE6ODA4MA==").unwrap();
    assert_eq!(node.address, "127.0.0.1");
    assert_eq!(node.port, 8080);
    assert_eq!(node.remark, "127.0.0.1");
    assert_eq!(creds(&node), ("chacha20-ietf-poly1305", "password"));
  }

  #[test]
  fn test_parse_ss_plain_userinfo() {
    let node = parse("ss://2022-blake3-aes-128-gcm:c2VjcmV0%2Bc2VjcmV0@[::1]:8388#v6").unwrap();
    assert_eq!(node.address, "::1");
    assert_eq!(creds(&node), ("2022-blake3-aes-128-gcm", "c2VjcmV0+c2VjcmV0"));
  }

  #[test]
  fn test_parse_ss_errors() {
    assert!(matches!(parse("ss://!!!@example.com:8388"), Err(LinkError::Encoding(_))));
    assert!(matches!(parse("ss://"), Err(LinkError::MalformedLink(_))));
    // base64("rc4-md5:pw")
    assert!(matches!(parse("ss://cmM0LW1kNTpwdw==@example.com:8388"), Err(LinkError::MalformedLink(_))));
    // base64("aes-128-gcm:pw")
    assert!(matches!(parse("ss://YWVzLTEyOC1nY206cHc=@example.com"), Err(LinkError::MalformedLink(_))));
  }

  #[test]
  fn test_parse_ss_rejects_undecodable_query() {
    assert!(matches!(
      parse("ss://aes-256-gcm:pw@h.example:443/?plugin=%FF%FE#x"),
      Err(LinkError::Encoding(_))
    ));
  }

  #[test]
  fn test_parse_ss_uses_plain_tcp() {
    let node = parse("ss://aes-256-gcm:pw@h.example:443").unwrap();
    assert_eq!(node.transport, Transport::plain_tcp());
    assert_eq!(node.security, Security::None);
  }
}
