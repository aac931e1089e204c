//! Turns proxy subscriptions (lists of vmess/vless/trojan/ss share-links) into
//! standalone Xray outbound configurations.

pub mod batch;
pub mod classify;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod node;
pub mod outbound;
pub mod parsers;
pub mod settings;
pub mod writer;

pub use batch::{convert_link, run, Converted, ParseResult, Summary};
pub use classify::{classify, ProtocolTag};
pub use error::{LinkError, ParseError};
pub use node::ParsedNode;
pub use outbound::{synthesize, OutboundConfig};

/// Parses one share-link straight into its outbound.
pub fn parse_link(link: &str) -> Result<OutboundConfig, LinkError> {
  let tag = classify(link)?;
  let node = parsers::parse(tag, link)?;
  Ok(synthesize(&node))
}
