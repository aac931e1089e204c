//! Downloads the subscription body.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use tokio::time::sleep;
use url::Url;

use crate::settings::Settings;

pub fn build_client(timeout_ms: u64, ua: &str) -> Result<Client> {
  let builder = Client::builder()
    .user_agent(ua)
    .redirect(reqwest::redirect::Policy::limited(10))
    .timeout(Duration::from_millis(timeout_ms.max(1)));
  Ok(builder.build()?)
}

fn rand_jitter_ms(max_jitter: u64) -> u64 {
  if max_jitter == 0 {
    0
  } else {
    fastrand::u64(0..max_jitter)
  }
}

pub(crate) fn backoff_ms(attempt: u32, base_ms: u64, jitter_ms: u64) -> u64 {
  base_ms
    .saturating_mul(1u64 << attempt.min(6))
    .saturating_add(rand_jitter_ms(jitter_ms))
}

fn is_retryable(status: StatusCode) -> bool {
  status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

pub fn validate_url(raw: &str) -> Result<Url> {
  let url = Url::parse(raw.trim()).with_context(|| format!("invalid subscription url: {raw}"))?;
  match url.scheme() {
    "http" | "https" => Ok(url),
    other => bail!("unsupported subscription url scheme: {other}"),
  }
}

/// Fetches the raw subscription body, retrying transport errors, 5xx and 429.
pub async fn fetch_subscription(url: &str, settings: &Settings) -> Result<Vec<u8>> {
  let url = validate_url(url)?;
  let client = build_client(settings.timeout_ms, &settings.user_agent)?;

  let mut last_error = None;
  for attempt in 0..=settings.retries {
    if attempt > 0 {
      let wait = backoff_ms(attempt - 1, settings.retry_delay_ms, settings.jitter_ms);
      debug!("retrying subscription fetch in {wait} ms (attempt {})", attempt + 1);
      sleep(Duration::from_millis(wait)).await;
    }

    let resp = match client.get(url.clone()).send().await {
      Ok(r) => r,
      Err(e) => {
        warn!("fetch {url} failed: {e}");
        last_error = Some(anyhow!(e).context(format!("fetch {url}")));
        continue;
      }
    };

    let status = resp.status();
    if !status.is_success() {
      let err = anyhow!("fetch {url}: http {status}");
      if is_retryable(status) {
        warn!("{err}");
        last_error = Some(err);
        continue;
      }
      return Err(err);
    }

    let bytes = resp
      .bytes()
      .await
      .with_context(|| format!("read body of {url}"))?;
    debug!("fetched {} bytes from {url}", bytes.len());
    return Ok(bytes.to_vec());
  }

  Err(last_error.unwrap_or_else(|| anyhow!("fetch {url}: no attempt made")))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validate_url() {
    assert!(validate_url("https://sub.example.com/link?token=abc").is_ok());
    assert!(validate_url("ftp://sub.example.com/").is_err());
    assert!(validate_url("not a url").is_err());
  }

  #[test]
  fn test_backoff_grows_and_respects_jitter_bound() {
    assert_eq!(backoff_ms(0, 100, 0), 100);
    assert_eq!(backoff_ms(2, 100, 0), 400);
    let b = backoff_ms(1, 100, 50);
    assert!((200..250).contains(&b));
    assert_eq!(backoff_ms(40, u64::MAX, 0), u64::MAX);
  }

  #[test]
  fn test_retryable_statuses() {
    assert!(is_retryable(StatusCode::BAD_GATEWAY));
    assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
    assert!(!is_retryable(StatusCode::NOT_FOUND));
  }
}
