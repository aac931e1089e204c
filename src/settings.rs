//! Optional YAML settings for the fetch and write stages.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub fn default_user_agent() -> &'static str {
  "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// User-Agent sent when fetching the subscription.
  pub user_agent: String,
  /// Per-request timeout (ms).
  pub timeout_ms: u64,
  /// Extra attempts after a failed fetch.
  pub retries: u32,
  /// Base delay between attempts (ms).
  pub retry_delay_ms: u64,
  /// Random jitter added to the delay (ms, [0, jitter_ms)).
  pub jitter_ms: u64,
  /// Directory the outbound documents are written to.
  pub out_dir: PathBuf,
  /// Pretty-print written JSON documents.
  pub pretty: bool,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      user_agent: default_user_agent().to_string(),
      timeout_ms: 10_000,
      retries: 2,
      retry_delay_ms: 1_000,
      jitter_ms: 500,
      out_dir: PathBuf::from("."),
      pretty: true,
    }
  }
}

impl Settings {
  pub fn from_yaml_str(raw: &str) -> Result<Self> {
    if raw.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(raw)?)
  }

  pub fn load(path: &Path) -> Result<Self> {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("read settings file {}", path.display()))?;
    Self::from_yaml_str(&raw).with_context(|| format!("parse settings file {}", path.display()))
  }
}
