use std::time::Duration;

use tokio::time::sleep;

/// Exponential backoff retry, shared by every outbound call site. The
/// decorator-level retry policy in §7 of the spec (default 2 retries /
/// 5s apart, login/refresh 3 retries / 10s apart) is two instances of
/// this with different constructor args.
#[derive(Debug, Clone)]
pub struct ExponentialBackoffRetry {
  pub base_delay: Duration,
  pub max_retries: u32,
  pub backoff_multiplier: f64,
  pub max_delay: Duration,
}

impl Default for ExponentialBackoffRetry {
  fn default() -> Self {
    Self {
      base_delay: Duration::from_secs(5),
      max_retries: 2,
      backoff_multiplier: 2.0,
      max_delay: Duration::from_secs(60),
    }
  }
}

impl ExponentialBackoffRetry {
  pub fn new(base_delay: Duration, max_retries: u32) -> Self {
    Self {
      base_delay,
      max_retries,
      ..Default::default()
    }
  }

  /// Login/refresh use 3 attempts at a 10s base, per spec §4.1.
  pub fn login() -> Self {
    Self::new(Duration::from_secs(10), 3)
  }

  fn calculate_delay(&self, attempt: u32) -> Duration {
    let delay_ms = (self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32)) as u64;
    Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
  }

  /// Runs `operation` up to `max_retries + 1` times. `is_retryable` decides
  /// whether a given error should be retried at all; non-retryable errors
  /// return immediately on first failure.
  pub async fn retry<F, Fut, T, E>(&self, is_retryable: impl Fn(&E) -> bool, operation: F) -> Result<T, E>
  where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
  {
    let mut last_error = None;

    for attempt in 0..=self.max_retries {
      match operation().await {
        Ok(result) => return Ok(result),
        Err(error) => {
          if !is_retryable(&error) || attempt == self.max_retries {
            return Err(error);
          }

          let delay = self.calculate_delay(attempt);
          tracing::warn!(attempt = attempt + 1, ?delay, "retrying after transient error");
          last_error = Some(error);
          sleep(delay).await;
        }
      }
    }

    Err(last_error.expect("loop always sets last_error before exhausting retries"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  #[derive(Debug, Clone, PartialEq)]
  struct Retryable(bool);

  #[tokio::test]
  async fn succeeds_after_transient_failures() {
    let retry = ExponentialBackoffRetry::new(Duration::from_millis(1), 3);
    let counter = Arc::new(AtomicU32::new(0));
    let c = counter.clone();

    let result: Result<&str, Retryable> = retry
      .retry(|e: &Retryable| e.0, || {
        let c = c.clone();
        async move {
          if c.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(Retryable(true))
          } else {
            Ok("ok")
          }
        }
      })
      .await;

    assert_eq!(result, Ok("ok"));
    assert_eq!(counter.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn non_retryable_stops_immediately() {
    let retry = ExponentialBackoffRetry::new(Duration::from_millis(1), 3);
    let counter = Arc::new(AtomicU32::new(0));
    let c = counter.clone();

    let result: Result<&str, Retryable> = retry
      .retry(|e: &Retryable| e.0, || {
        let c = c.clone();
        async move {
          c.fetch_add(1, Ordering::SeqCst);
          Err(Retryable(false))
        }
      })
      .await;

    assert_eq!(result, Err(Retryable(false)));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn exhausts_retries_and_returns_last_error() {
    let retry = ExponentialBackoffRetry::new(Duration::from_millis(1), 2);
    let counter = Arc::new(AtomicU32::new(0));
    let c = counter.clone();

    let result: Result<&str, Retryable> = retry
      .retry(|e: &Retryable| e.0, || {
        let c = c.clone();
        async move {
          c.fetch_add(1, Ordering::SeqCst);
          Err(Retryable(true))
        }
      })
      .await;

    assert!(result.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 3);
  }
}
