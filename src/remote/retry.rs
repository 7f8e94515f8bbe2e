//! Retry wrapper for remote mutations.

use color_eyre::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Linear backoff: the n-th failed attempt waits `backoff * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub attempts: u32,
  pub backoff: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      attempts: 3,
      backoff: Duration::from_millis(300),
    }
  }
}

/// Run `op` until it succeeds or the policy is exhausted, returning the last
/// error.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let attempts = policy.attempts.max(1);
  let mut attempt = 1;

  loop {
    match op().await {
      Ok(value) => return Ok(value),
      Err(e) if attempt < attempts => {
        let delay = policy.backoff * attempt;
        warn!(what, attempt, error = %e, "remote call failed, retrying in {:?}", delay);
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
      Err(e) => return Err(e),
    }
  }
}
