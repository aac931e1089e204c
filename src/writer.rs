//! Persists converted outbounds, one JSON document per node.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;

use crate::batch::{Converted, ParseResult};
use crate::outbound::OutboundConfig;

const UNNAMED: &str = "unnamed_config";

/// Makes a remark safe to use as a file stem: separators and shell-hostile
/// characters collapse into `_`, anything else outside `[\w.-]` is dropped.
pub fn sanitize_filename(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut in_sep = false;
  for c in name.trim().chars() {
    if c.is_whitespace() || matches!(c, '/' | '\\' | '|' | ':' | '<' | '>' | '*' | '?' | '"' | '\'') {
      if !in_sep {
        out.push('_');
        in_sep = true;
      }
      continue;
    }
    in_sep = false;
    if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
      out.push(c);
    }
  }
  let trimmed = out.trim_matches('.');
  if trimmed.is_empty() {
    UNNAMED.to_string()
  } else {
    trimmed.to_string()
  }
}

/// The file written per node: a config fragment with a single outbound.
#[derive(Debug, Serialize)]
pub struct ConfigDocument<'a> {
  pub outbounds: [&'a OutboundConfig; 1],
  pub remarks: &'a str,
}

impl<'a> ConfigDocument<'a> {
  pub fn new(c: &'a Converted) -> Self {
    Self {
      outbounds: [&c.outbound],
      remarks: &c.remark,
    }
  }
}

/// Hands out distinct file names; a repeated remark gets its link index appended.
#[derive(Debug, Default)]
pub struct FileNamer {
  used: HashSet<String>,
}

impl FileNamer {
  pub fn name_for(&mut self, remark: &str, index: usize) -> String {
    let stem = sanitize_filename(remark);
    let mut name = format!("{stem}.json");
    if self.used.contains(&name) {
      name = format!("{stem}_{index}.json");
    }
    let mut n = 2;
    while self.used.contains(&name) {
      name = format!("{stem}_{index}_{n}.json");
      n += 1;
    }
    self.used.insert(name.clone());
    name
  }
}

/// One line of `--jsonl` output.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum JsonlRecord<'a> {
  Ok {
    index: usize,
    ok: bool,
    remark: &'a str,
    outbound: &'a OutboundConfig,
  },
  Err {
    index: usize,
    ok: bool,
    link: &'a str,
    kind: &'static str,
    error: String,
  },
}

impl<'a> JsonlRecord<'a> {
  pub fn new(result: &'a ParseResult) -> Self {
    match result {
      Ok(c) => JsonlRecord::Ok {
        index: c.index,
        ok: true,
        remark: &c.remark,
        outbound: &c.outbound,
      },
      Err(e) => JsonlRecord::Err {
        index: e.index,
        ok: false,
        link: &e.link,
        kind: e.error.kind(),
        error: e.error.to_string(),
      },
    }
  }
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> serde_json::Result<String> {
  if pretty {
    serde_json::to_string_pretty(value)
  } else {
    serde_json::to_string(value)
  }
}

/// Writes every successful result under `out_dir` and reports every failure.
/// Returns the written paths in result order.
pub async fn write_all(results: &[ParseResult], out_dir: &Path, pretty: bool) -> Result<Vec<PathBuf>> {
  tokio::fs::create_dir_all(out_dir)
    .await
    .with_context(|| format!("create output dir {}", out_dir.display()))?;

  let mut namer = FileNamer::default();
  let mut written = Vec::new();
  for result in results {
    match result {
      Ok(c) => {
        let path = out_dir.join(namer.name_for(&c.remark, c.index));
        let body = to_json(&ConfigDocument::new(c), pretty)?;
        tokio::fs::write(&path, body)
          .await
          .with_context(|| format!("write {}", path.display()))?;
        info!("wrote {}", path.display());
        written.push(path);
      }
      Err(e) => warn!("skipped {e}"),
    }
  }
  Ok(written)
}
