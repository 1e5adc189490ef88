use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use steam_core::{TokenValidator, ValidationError};
use tracing::warn;

use crate::state::AppState;

/// Returns a `tower`-compatible middleware closure enforcing `scope` on
/// the wrapped route, the same `verify_token_middleware` shape
/// `fechatter_server::middlewares::bearer_auth` uses — raw header
/// extraction rather than a typed extractor, since the validator call is
/// itself fallible and async.
pub fn require_scope(
  scope: &'static str,
) -> impl Fn(State<AppState>, Request<Body>, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, StatusCode>> + Send>> + Clone {
  move |State(state): State<AppState>, request: Request<Body>, next: Next| {
    Box::pin(async move {
      let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

      let Some(token) = token else {
        warn!(scope, "missing bearer token");
        return Err(StatusCode::UNAUTHORIZED);
      };

      let info = state.token_validator().introspect(token).await.map_err(|e| match e {
        ValidationError::Inactive => StatusCode::UNAUTHORIZED,
        ValidationError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ValidationError::MissingScope(_) => StatusCode::FORBIDDEN,
      })?;

      if TokenValidator::require_scope(&info, scope).is_err() {
        warn!(scope, client_id = %info.client_id, "token missing required scope");
        return Err(StatusCode::FORBIDDEN);
      }

      Ok(next.run(request).await)
    })
  }
}
