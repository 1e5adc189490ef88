use thiserror::Error;

/// Shared domain error taxonomy. Each binary crate wraps this in its own
/// `AppError` and implements `IntoResponse` / broker-ack mapping on top,
/// the same split `fechatter_core::error::CoreError` and
/// `fechatter_server::error::AppError` use.
#[derive(Error, Debug)]
pub enum CoreError {
  #[error("database error: {0}")]
  Database(String),

  #[error("validation error: {0}")]
  Validation(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<sqlx::Error> for CoreError {
  fn from(e: sqlx::Error) -> Self {
    CoreError::Database(e.to_string())
  }
}

/// Errors surfaced by `TokenClient`. An `AuthenticationError` is terminal:
/// it means a refresh-then-retry cycle already happened and still failed.
#[derive(Error, Debug)]
pub enum TokenError {
  #[error("authentication failed after refresh: {0}")]
  Authentication(String),

  #[error("upstream http error: status={status} body={body}")]
  Api { status: u16, body: String },

  #[error("upstream rate limited")]
  RateLimited,

  #[error("transient transport error: {0}")]
  Transient(#[from] reqwest::Error),
}

impl TokenError {
  /// 5xx and connect errors are retried; 4xx auth failures are not.
  pub fn is_retryable(&self) -> bool {
    match self {
      TokenError::Transient(_) | TokenError::RateLimited => true,
      TokenError::Api { status, .. } => *status >= 500,
      TokenError::Authentication(_) => false,
    }
  }
}

/// Errors a broker message handler can raise. `Handled` maps to a REJECT
/// without requeue (bad input, business-logic failure); anything else
/// propagating out of a handler is treated the same way by the consumer
/// loop, matching the source's `except Exception` catch-all.
#[derive(Error, Debug)]
pub enum BrokerError {
  #[error("malformed envelope: {0}")]
  MalformedEnvelope(String),

  #[error("unknown task name: {0}")]
  UnknownTask(String),

  #[error("task handler failed: {0}")]
  Handled(String),

  #[error("connection error: {0}")]
  Connection(String),
}
