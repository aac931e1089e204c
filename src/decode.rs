//! Subscription body decoding.
//!
//! A subscription is usually the base64 of a newline separated link list, but
//! plenty of providers serve the list as plain text. Both are accepted here.

use base64::engine::general_purpose;
use base64::Engine;
use log::debug;

use crate::error::LinkError;

/// Maximum number of `=` characters appended when repairing stripped padding.
const MAX_PADDING: usize = 3;

pub(crate) fn looks_like_base64(text: &str) -> bool {
  let s = text.trim();
  if s.len() < 16 {
    return false;
  }
  s.chars().all(|c| {
    c.is_whitespace() || c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '-' | '_')
  })
}

/// Decodes base64 in the standard or URL-safe alphabet, repairing missing
/// padding. Embedded whitespace (line-wrapped bodies) is ignored.
pub fn decode_base64(s: &str) -> Option<Vec<u8>> {
  let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
  if cleaned.is_empty() {
    return None;
  }
  let bare = cleaned.trim_end_matches('=');

  let mut candidates = Vec::with_capacity(MAX_PADDING + 1);
  candidates.push(cleaned.clone());
  for pad in 1..=MAX_PADDING {
    let cand = format!("{bare}{}", "=".repeat(pad));
    if cand != cleaned {
      candidates.push(cand);
    }
  }

  for cand in &candidates {
    for engine in [&general_purpose::STANDARD, &general_purpose::URL_SAFE] {
      if let Ok(bytes) = engine.decode(cand) {
        return Some(bytes);
      }
    }
  }
  None
}

/// Like [`decode_base64`] but also requires the payload to be UTF-8 text.
pub fn decode_base64_text(s: &str) -> Option<String> {
  let bytes = decode_base64(s)?;
  let txt = String::from_utf8(bytes).ok()?;
  if txt.trim().is_empty() {
    None
  } else {
    Some(txt)
  }
}

fn split_lines(text: &str) -> Vec<String> {
  text
    .lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .map(str::to_string)
    .collect()
}

fn body_text(body: &[u8]) -> String {
  String::from_utf8_lossy(body)
    .trim_start_matches('\u{feff}')
    .trim()
    .to_string()
}

/// Turns a raw subscription body into its ordered list of candidate links.
///
/// Never fails: a body that is neither base64 nor a link list just yields
/// whatever non-empty lines it has, and an empty body yields nothing.
pub fn decode(body: &[u8]) -> Vec<String> {
  let raw = body_text(body);
  if raw.is_empty() {
    return vec![];
  }

  if !raw.contains("://") && looks_like_base64(&raw) {
    match decode_base64_text(&raw) {
      Some(decoded) => {
        let links = split_lines(&decoded);
        debug!("decoded base64 subscription into {} lines", links.len());
        return links;
      }
      None => debug!("subscription is not valid base64, reading it as plain text"),
    }
  }

  split_lines(&raw)
}

/// Rejects a body with no content at all, the one case reported as a
/// `Decode` error rather than an empty result.
pub fn check_body(body: &[u8]) -> Result<(), LinkError> {
  if body_text(body).is_empty() {
    return Err(LinkError::Decode("subscription body is empty".to_string()));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn b64(s: &str) -> String {
    general_purpose::STANDARD.encode(s)
  }

  #[test]
  fn test_decode_base64_body() {
    let body = b64("vless://a@h:1#x\n\n  trojan://p@h:2  \r\n");
    assert_eq!(decode(body.as_bytes()), vec!["vless://a@h:1#x", "trojan://p@h:2"]);
  }

  #[test]
  fn test_decode_repairs_stripped_padding() {
    let encoded = b64("ss://YWVzLTEyOC1nY206cGFzcw@1.2.3.4:8388#n\n");
    let stripped = encoded.trim_end_matches('=');
    assert_ne!(encoded.len(), stripped.len());
    assert_eq!(decode(stripped.as_bytes()), vec!["ss://YWVzLTEyOC1nY206cGFzcw@1.2.3.4:8388#n"]);
  }

  #[test]
  fn test_decode_url_safe_alphabet() {
    let encoded = general_purpose::URL_SAFE_NO_PAD.encode("vmess://???>>>\nvless://x@y:1");
    assert!(encoded.contains('_') || encoded.contains('-'));
    assert_eq!(decode(encoded.as_bytes()), vec!["vmess://???>>>", "vless://x@y:1"]);
  }

  #[test]
  fn test_decode_wrapped_base64() {
    let encoded = b64("trojan://pass@host:443?security=tls\nvless://id@host:443");
    let wrapped = format!("{}\n{}", &encoded[..20], &encoded[20..]);
    assert_eq!(decode(wrapped.as_bytes()).len(), 2);
  }

  #[test]
  fn test_decode_plain_text_fallback() {
    let body = "trojan://pass@host:443?security=tls&sni=example.com\nvmess://abc\n";
    assert_eq!(
      decode(body.as_bytes()),
      vec!["trojan://pass@host:443?security=tls&sni=example.com", "vmess://abc"]
    );
  }

  #[test]
  fn test_decode_garbage_yields_lines_not_error() {
    assert_eq!(decode(b"hello world\n"), vec!["hello world"]);
    assert!(decode(b"").is_empty());
    assert!(decode(b"  \n\t ").is_empty());
  }

  #[test]
  fn test_decode_base64_rejects_invalid() {
    assert!(decode_base64("!!!not base64!!!").is_none());
    assert!(decode_base64("").is_none());
  }

  #[test]
  fn test_check_body() {
    assert!(matches!(check_body(b" \n"), Err(LinkError::Decode(_))));
    assert!(check_body(b"vless://x@y:1").is_ok());
  }
}
