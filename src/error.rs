use thiserror::Error;

/// Why a single share-link (or the subscription body) could not be turned into
/// an outbound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
  /// The subscription body held nothing that could be read as links.
  #[error("decode error: {0}")]
  Decode(String),

  /// The scheme prefix is missing or not one of the supported protocols.
  #[error("unknown scheme: {0}")]
  UnknownScheme(String),

  /// The scheme is known but a required field is missing, empty or invalid.
  #[error("malformed link: {0}")]
  MalformedLink(String),

  /// An embedded base64 blob or percent-encoded segment could not be decoded.
  #[error("encoding error: {0}")]
  Encoding(String),
}

impl LinkError {
  pub fn malformed(msg: impl Into<String>) -> Self {
    LinkError::MalformedLink(msg.into())
  }

  pub fn encoding(msg: impl Into<String>) -> Self {
    LinkError::Encoding(msg.into())
  }

  pub fn missing(field: &str) -> Self {
    LinkError::MalformedLink(format!("missing required field `{field}`"))
  }

  pub fn empty(field: &str) -> Self {
    LinkError::MalformedLink(format!("field `{field}` is empty"))
  }

  /// Short machine-friendly name, used in JSONL error records.
  pub fn kind(&self) -> &'static str {
    match self {
      LinkError::Decode(_) => "DecodeError",
      LinkError::UnknownScheme(_) => "UnknownScheme",
      LinkError::MalformedLink(_) => "MalformedLink",
      LinkError::Encoding(_) => "EncodingError",
    }
  }
}

/// A failed link, tagged with its text and its index in the decoded link list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("link #{index} ({}): {error}", preview(link, 60))]
pub struct ParseError {
  pub index: usize,
  pub link: String,
  #[source]
  pub error: LinkError,
}

impl ParseError {
  pub fn new(index: usize, link: impl Into<String>, error: LinkError) -> Self {
    Self {
      index,
      link: link.into(),
      error,
    }
  }
}

/// Truncates a link for log lines; share-links can carry kilobytes of base64.
pub fn preview(s: &str, max_chars: usize) -> String {
  let mut out: String = s.chars().take(max_chars).collect();
  if s.chars().count() > max_chars {
    out.push_str("...");
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display_includes_index_and_reason() {
    let e = ParseError::new(3, "wireguard://x", LinkError::UnknownScheme("wireguard".into()));
    assert_eq!(e.to_string(), "link #3 (wireguard://x): unknown scheme: wireguard");
    assert_eq!(e.error.kind(), "UnknownScheme");
    let source = std::error::Error::source(&e).map(|s| s.to_string());
    assert_eq!(source.as_deref(), Some("unknown scheme: wireguard"));
  }

  #[test]
  fn test_preview_truncates_on_char_boundary() {
    assert_eq!(preview("abcdef", 3), "abc...");
    assert_eq!(preview("äöü", 5), "äöü");
    assert_eq!(preview("äöüß", 2), "äö...");
  }

  #[test]
  fn test_missing_names_field() {
    assert_eq!(
      LinkError::missing("add").to_string(),
      "malformed link: missing required field `add`"
    );
  }
}
