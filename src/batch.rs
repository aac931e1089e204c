//! Decoder → classifier → parser → synthesizer, once per link.

use log::{debug, info};

use crate::classify::classify;
use crate::decode;
use crate::error::{preview, ParseError};
use crate::outbound::{synthesize, OutboundConfig};
use crate::parsers;

/// A link that made it all the way to an outbound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
  /// Position of the link in the decoded subscription, before omission.
  pub index: usize,
  pub remark: String,
  pub outbound: OutboundConfig,
}

pub type ParseResult = Result<Converted, ParseError>;

/// Converts a single link. `index` only tags the result.
pub fn convert_link(index: usize, link: &str) -> ParseResult {
  let wrap = |e| ParseError::new(index, link, e);
  let tag = classify(link).map_err(wrap)?;
  let node = parsers::parse(tag, link).map_err(wrap)?;
  debug!("link #{index}: {tag} {}:{} ({})", node.address, node.port, node.remark);
  Ok(Converted {
    index,
    outbound: synthesize(&node),
    remark: node.remark,
  })
}

/// Converts every link of a subscription body, skipping the first `omit_first`.
///
/// Results come back in link order; a failing link never stops the batch.
pub fn run(body: &[u8], omit_first: usize) -> Vec<ParseResult> {
  let links = decode::decode(body);
  convert_links(&links, omit_first)
}

pub fn convert_links<S: AsRef<str>>(links: &[S], omit_first: usize) -> Vec<ParseResult> {
  let skipped = omit_first.min(links.len());
  for (i, link) in links.iter().take(skipped).enumerate() {
    info!("omitting link #{i}: {}", preview(link.as_ref(), 50));
  }
  links
    .iter()
    .enumerate()
    .skip(skipped)
    .map(|(i, link)| convert_link(i, link.as_ref()))
    .collect()
}

/// Counts for the end-of-run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
  pub attempted: usize,
  pub succeeded: usize,
  pub failed: usize,
}

impl Summary {
  pub fn of(results: &[ParseResult]) -> Self {
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    Summary {
      attempted: results.len(),
      succeeded,
      failed: results.len() - succeeded,
    }
  }
}
