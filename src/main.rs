use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use tokio::io::{AsyncReadExt, BufReader};

use subxray::batch::{self, Summary};
use subxray::settings::Settings;
use subxray::writer::{self, JsonlRecord};
use subxray::{decode, fetch};

/// Fetch a proxy subscription and write one Xray outbound config per share-link.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
  /// Subscription URL.
  #[arg(required_unless_present = "stdin")]
  url: Option<String>,

  /// Read the subscription body from stdin instead of fetching a URL.
  #[arg(long, default_value_t = false, conflicts_with = "url")]
  stdin: bool,

  /// Skip the first N links (often a traffic/expiry notice). `-o` alone skips one.
  #[arg(
    short = 'o',
    long,
    value_name = "N",
    default_value_t = 0,
    num_args = 0..=1,
    require_equals = true,
    default_missing_value = "1"
  )]
  omit_first: usize,

  /// Directory for the generated files (default: settings file, else ".").
  #[arg(long)]
  out_dir: Option<PathBuf>,

  /// Print one JSON record per link to stdout instead of writing files.
  #[arg(long, default_value_t = false)]
  jsonl: bool,

  /// YAML settings file.
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Request timeout (ms).
  #[arg(long)]
  timeout_ms: Option<u64>,

  /// User-Agent header.
  #[arg(long)]
  user_agent: Option<String>,
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
  let mut settings = match &cli.config {
    Some(path) => Settings::load(path)?,
    None => Settings::default(),
  };
  if let Some(dir) = &cli.out_dir {
    settings.out_dir = dir.clone();
  }
  if let Some(ms) = cli.timeout_ms {
    settings.timeout_ms = ms;
  }
  if let Some(ua) = &cli.user_agent {
    settings.user_agent = ua.clone();
  }
  Ok(settings)
}

async fn read_body(cli: &Cli, settings: &Settings) -> Result<Vec<u8>> {
  if cli.stdin {
    let mut buf = Vec::new();
    BufReader::new(tokio::io::stdin())
      .read_to_end(&mut buf)
      .await
      .context("read subscription from stdin")?;
    return Ok(buf);
  }
  let url = cli.url.as_deref().unwrap_or_default();
  info!("fetching subscription from {url}");
  fetch::fetch_subscription(url, settings).await
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
  env_logger::init_from_env(Env::default().default_filter_or("info"));
  let cli = Cli::parse();
  let settings = resolve_settings(&cli)?;

  let body = read_body(&cli, &settings).await?;
  decode::check_body(&body)?;

  let results = batch::run(&body, cli.omit_first);

  if cli.jsonl {
    for r in &results {
      println!("{}", serde_json::to_string(&JsonlRecord::new(r))?);
    }
  } else {
    writer::write_all(&results, &settings.out_dir, settings.pretty).await?;
  }

  let summary = Summary::of(&results);
  info!(
    "{} links attempted, {} converted, {} failed",
    summary.attempted, summary.succeeded, summary.failed
  );
  if summary.succeeded == 0 {
    bail!("no usable links in subscription ({} attempted)", summary.attempted);
  }
  Ok(())
}
