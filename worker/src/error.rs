use steam_core::{BrokerError, TokenError};
use thiserror::Error;

/// A handler-local failure wraps directly into `BrokerError::Handled` so
/// the consumer loop rejects the envelope without requeue, matching the
/// source's blanket `except Exception` -> `basic_reject` handling.
#[derive(Error, Debug)]
pub enum AppError {
  #[error("upstream steam api error: {0}")]
  SteamApi(String),

  #[error("backend call failed: {0}")]
  Backend(#[from] TokenError),

  #[error("task handling failed: {0}")]
  Handled(String),
}

impl From<AppError> for BrokerError {
  fn from(e: AppError) -> Self {
    BrokerError::Handled(e.to_string())
  }
}
