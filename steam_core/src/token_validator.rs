use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::cache::Cache;
use crate::models::token::TokenInfo;

/// Fixed at 5 minutes regardless of the token's own expiry — a deliberate
/// bounded-staleness compromise (`spec.md` §4.2/§9): it limits the
/// cache-poisoning window after password rotation while absorbing
/// validation traffic. Do not widen this to "cache until expires_at"
/// without also wiring revocation-on-write invalidation.
pub const TOKEN_INFO_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum ValidationError {
  #[error("token is not active")]
  Inactive,
  #[error("token missing required scope: {0}")]
  MissingScope(String),
  #[error("introspection request failed: {0}")]
  Transport(#[from] reqwest::Error),
}

/// Inbound authentication: introspects a bearer token against the Auth
/// server's `/token_info` endpoint, caching the result in the shared
/// `Cache` under `token_<opaque>` (`spec.md` §4.2).
pub struct TokenValidator {
  http: Client,
  auth_base_url: String,
  cache: Cache,
}

impl TokenValidator {
  pub fn new(http: Client, auth_base_url: impl Into<String>, cache: Cache) -> Self {
    Self {
      http,
      auth_base_url: auth_base_url.into(),
      cache,
    }
  }

  pub async fn introspect(&self, token: &str) -> Result<TokenInfo, ValidationError> {
    if let Some(cached) = self.cache.get::<TokenInfo>("token", token).await {
      return Self::require_active(cached);
    }

    let info: TokenInfo = self
      .http
      .post(format!("{}/api/oauth2/token_info", self.auth_base_url))
      .json(&IntrospectRequest { access_token: token })
      .send()
      .await?
      .json()
      .await?;

    self.cache.set("token", token, &info, TOKEN_INFO_CACHE_TTL).await;
    Self::require_active(info)
  }

  fn require_active(info: TokenInfo) -> Result<TokenInfo, ValidationError> {
    if !info.is_active {
      return Err(ValidationError::Inactive);
    }
    Ok(info)
  }

  pub fn require_scope(info: &TokenInfo, scope: &str) -> Result<(), ValidationError> {
    if info.scopes.iter().any(|s| s == scope) {
      Ok(())
    } else {
      Err(ValidationError::MissingScope(scope.to_string()))
    }
  }
}

#[derive(Serialize)]
struct IntrospectRequest<'a> {
  access_token: &'a str,
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  #[tokio::test]
  async fn cached_inactive_token_is_rejected() {
    let cache = Cache::new(100);
    cache
      .set(
        "token",
        "tok-1",
        &TokenInfo {
          is_active: false,
          client_id: "client-1".into(),
          scopes: vec![],
          expires_at: Utc::now(),
        },
        TOKEN_INFO_CACHE_TTL,
      )
      .await;

    let validator = TokenValidator::new(Client::new(), "http://auth.local", cache);
    let result = validator.introspect("tok-1").await;
    assert!(matches!(result, Err(ValidationError::Inactive)));
  }

  #[test]
  fn require_scope_rejects_missing_scope() {
    let info = TokenInfo {
      is_active: true,
      client_id: "client-1".into(),
      scopes: vec!["backend/package".into()],
      expires_at: Utc::now(),
    };
    assert!(TokenValidator::require_scope(&info, "backend/package").is_ok());
    assert!(matches!(
      TokenValidator::require_scope(&info, "orchestrator/tasks"),
      Err(ValidationError::MissingScope(_))
    ));
  }
}
