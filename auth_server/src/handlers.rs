use axum::extract::State;
use axum::Json;
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use steam_core::CoreError;

use crate::error::AppError;
use crate::secret::verify_secret;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TokenRequest {
  client_id: String,
  client_secret: String,
  #[serde(default)]
  scopes: Vec<String>,
}

#[derive(Serialize)]
pub struct TokenResponse {
  access_token: String,
  expires_in: i64,
  refresh_token: String,
  token_type: String,
}

/// `POST /api/oauth2/token` — client-credentials grant
/// (`spec.md` §6, `auth/auth/models/clients.py` + `tokens.py`).
pub async fn issue_token(State(state): State<AppState>, Json(req): Json<TokenRequest>) -> Result<Json<TokenResponse>, AppError> {
  let repo = state.repo();
  let tokens_cfg = &state.config().tokens;

  let client = repo
    .find_by_client_id(&req.client_id)
    .await?
    .ok_or_else(|| CoreError::Unauthorized("invalid_client".to_string()))?;

  if !verify_secret(&req.client_secret, &client.secret)? {
    return Err(CoreError::Unauthorized("invalid_client".to_string()).into());
  }

  let scopes = repo.resolve_requested_scopes(client.pk, &req.scopes).await?;

  let access = repo
    .issue_access_token(
      client.pk,
      &scopes,
      ChronoDuration::seconds(tokens_cfg.access_token_expire_seconds),
      tokens_cfg.access_token_byte_length,
      tokens_cfg.max_access_tokens_per_client,
    )
    .await?;

  if let Some(evicted) = &access.evicted_token {
    if let Err(e) = steam_core::cache_invalidation::publish_token_invalidated(state.nats(), evicted).await {
      tracing::warn!(error = %e, "failed to publish token invalidation");
    }
  }

  let refresh_token = repo
    .issue_refresh_token(
      client.pk,
      ChronoDuration::seconds(tokens_cfg.refresh_token_expire_seconds),
      tokens_cfg.refresh_token_byte_length,
    )
    .await?;

  Ok(Json(TokenResponse {
    access_token: access.token,
    expires_in: tokens_cfg.access_token_expire_seconds,
    refresh_token,
    token_type: "bearer".to_string(),
  }))
}

#[derive(Deserialize)]
pub struct RefreshRequest {
  refresh_token: String,
  #[serde(default)]
  scopes: Vec<String>,
}

#[derive(Serialize)]
pub struct RefreshedResponse {
  access_token: String,
  expires_in: i64,
}

/// `POST /api/oauth2/token_refresh` — mints a fresh access token for the
/// refresh token's owning client without touching the refresh token
/// itself (`tokens.py::RefreshToken.get_or_create_token`).
pub async fn refresh_token(State(state): State<AppState>, Json(req): Json<RefreshRequest>) -> Result<Json<RefreshedResponse>, AppError> {
  let repo = state.repo();
  let tokens_cfg = &state.config().tokens;

  let client_pk = repo
    .active_refresh_token_owner(&req.refresh_token)
    .await?
    .ok_or_else(|| CoreError::Unauthorized("invalid_token".to_string()))?;

  let scopes = repo.resolve_requested_scopes(client_pk, &req.scopes).await?;

  let access = repo
    .issue_access_token(
      client_pk,
      &scopes,
      ChronoDuration::seconds(tokens_cfg.access_token_expire_seconds),
      tokens_cfg.access_token_byte_length,
      tokens_cfg.max_access_tokens_per_client,
    )
    .await?;

  if let Some(evicted) = &access.evicted_token {
    if let Err(e) = steam_core::cache_invalidation::publish_token_invalidated(state.nats(), evicted).await {
      tracing::warn!(error = %e, "failed to publish token invalidation");
    }
  }

  Ok(Json(RefreshedResponse {
    access_token: access.token,
    expires_in: tokens_cfg.access_token_expire_seconds,
  }))
}

#[derive(Deserialize)]
pub struct IntrospectRequest {
  access_token: String,
}

#[derive(Serialize)]
pub struct IntrospectResponse {
  is_active: bool,
  client_id: String,
  scopes: Vec<String>,
  expires_at: chrono::DateTime<chrono::Utc>,
}

/// `POST /api/oauth2/token_info` — backs `steam_core::TokenValidator`.
/// Unknown tokens are `invalid_token`, not a silent inactive response,
/// so the validator's 401 mapping is unambiguous.
pub async fn introspect(State(state): State<AppState>, Json(req): Json<IntrospectRequest>) -> Result<Json<IntrospectResponse>, AppError> {
  let info = state
    .repo()
    .introspect(&req.access_token)
    .await?
    .ok_or_else(|| CoreError::Unauthorized("invalid_token".to_string()))?;

  Ok(Json(IntrospectResponse {
    is_active: info.is_active,
    client_id: info.client_id,
    scopes: info.scopes,
    expires_at: info.expires_at,
  }))
}

pub async fn health_check() -> &'static str {
  "ok"
}
