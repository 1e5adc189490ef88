use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use steam_core::CoreError;
use thiserror::Error;

/// Per-binary error wrapper over `steam_core::CoreError`, the same split
/// `fechatter_core::CoreError` / `fechatter_server::AppError` use. The
/// `Unauthorized`/`Forbidden` messages carry the exact wire codes
/// `spec.md` §6 names (`invalid_client`, `invalid_token`, `invalid_scope`)
/// so `IntoResponse` below needs no further translation.
#[derive(Error, Debug)]
pub enum AppError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("configuration error: {0}")]
  Config(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      AppError::Core(CoreError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg.clone()),
      AppError::Core(CoreError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
      AppError::Core(CoreError::Conflict(msg)) => (StatusCode::CONFLICT, msg.clone()),
      AppError::Core(CoreError::Unauthorized(msg)) => (StatusCode::UNAUTHORIZED, msg.clone()),
      AppError::Core(CoreError::Forbidden(msg)) => (StatusCode::FORBIDDEN, msg.clone()),
      AppError::Core(_) | AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
    };

    (status, Json(json!({ "error": message }))).into_response()
  }
}
