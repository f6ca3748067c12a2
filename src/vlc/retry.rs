//! Bounded retry around the connect step.

use std::thread;
use std::time::Duration;

use super::connection::ConnectionError;

/// Connect attempts made while a freshly started instance comes up.
pub const MAX_CONNECT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, including the first one.
  pub max_attempts: u32,
  /// Pause between two attempts.
  pub delay: Duration,
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, delay: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      delay,
    }
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::new(MAX_CONNECT_ATTEMPTS, Duration::from_secs(1))
  }
}

/// Run `op` until it succeeds, fails with anything but `ConnectionRefused`,
/// or the policy runs out of attempts. `op` receives the 1-based attempt.
pub fn retry_on_refused<T, F>(policy: &RetryPolicy, mut op: F) -> Result<T, ConnectionError>
where
  F: FnMut(u32) -> Result<T, ConnectionError>,
{
  let mut attempt = 1;
  loop {
    match op(attempt) {
      Ok(value) => {
        if attempt > 1 {
          log::debug!("Connected after {} attempts", attempt);
        }
        return Ok(value);
      }
      Err(e) if e.is_connection_refused() && attempt < policy.max_attempts => {
        log::debug!(
          "Connect attempt {}/{} failed: {}",
          attempt,
          policy.max_attempts,
          e
        );
        thread::sleep(policy.delay);
        attempt += 1;
      }
      Err(e) => {
        if e.is_connection_refused() {
          log::warn!("Giving up after {} connect attempts: {}", attempt, e);
        }
        return Err(e);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io;

  fn refused() -> ConnectionError {
    ConnectionError::ConnectionRefused {
      addr: "localhost:9595".into(),
      source: io::Error::from(io::ErrorKind::ConnectionRefused),
    }
  }

  fn fast(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(1))
  }

  #[test]
  fn test_gives_up_after_exactly_three_attempts() {
    let mut calls = 0;
    let result: Result<(), _> = retry_on_refused(&fast(MAX_CONNECT_ATTEMPTS), |_| {
      calls += 1;
      Err(refused())
    });

    assert!(result.unwrap_err().is_connection_refused());
    assert_eq!(calls, 3);
  }

  #[test]
  fn test_stops_at_first_success() {
    let mut seen = Vec::new();
    let result = retry_on_refused(&fast(3), |attempt| {
      seen.push(attempt);
      if attempt < 2 {
        Err(refused())
      } else {
        Ok("connected")
      }
    });

    assert_eq!(result.unwrap(), "connected");
    assert_eq!(seen, vec![1, 2]);
  }

  #[test]
  fn test_other_errors_are_not_retried() {
    let mut calls = 0;
    let result: Result<(), _> = retry_on_refused(&fast(3), |_| {
      calls += 1;
      Err(ConnectionError::Io(io::Error::from(io::ErrorKind::PermissionDenied)))
    });

    assert!(matches!(result, Err(ConnectionError::Io(_))));
    assert_eq!(calls, 1);
  }

  #[test]
  fn test_zero_attempts_still_tries_once() {
    let mut calls = 0;
    let _: Result<(), _> = retry_on_refused(&fast(0), |_| {
      calls += 1;
      Err(refused())
    });
    assert_eq!(calls, 1);
  }
}
