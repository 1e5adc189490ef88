use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::TokenError;
use crate::models::token::{RefreshedAccessToken, TokenPair};
use crate::retry::ExponentialBackoffRetry;

#[derive(Clone)]
struct Tokens {
  access_token: String,
  refresh_token: String,
}

/// Outbound authentication for Orchestrator/Worker calls to the Backend
/// and Auth server. `login`/`refresh` hold the `tokens` mutex for the
/// entire network round-trip, not just the struct mutation, so concurrent
/// callers genuinely share one in-flight refresh — the single-flight
/// pattern used by token caches elsewhere in this corpus (e.g. Firestore's
/// `TokenCache`, which holds its `RwLock` write guard across the whole
/// refresh call). A double-check against the access token that triggered
/// the refresh lets a caller that was merely queued behind someone else's
/// refresh skip its own redundant network call.
pub struct TokenClient {
  http: Client,
  auth_base_url: String,
  client_id: String,
  client_secret: String,
  scopes: Vec<String>,
  tokens: Mutex<Option<Tokens>>,
}

impl TokenClient {
  pub fn new(http: Client, auth_base_url: impl Into<String>, client_id: impl Into<String>, client_secret: impl Into<String>, scopes: Vec<String>) -> Arc<Self> {
    Arc::new(Self {
      http,
      auth_base_url: auth_base_url.into(),
      client_id: client_id.into(),
      client_secret: client_secret.into(),
      scopes,
      tokens: Mutex::new(None),
    })
  }

  /// `POST {client_id, client_secret, scopes}` to `/api/oauth2/token`.
  /// Wrapped in a 3-attempt/10s-base backoff over connect/5xx errors
  /// (`spec.md` §4.1). Holds the `tokens` lock across the whole call: a
  /// second caller blocked on the same lock finds `guard.is_some()` once
  /// it wakes and returns immediately instead of logging in again.
  pub async fn login(&self) -> Result<(), TokenError> {
    self.login_inner(false).await
  }

  /// `force=true` is used by `refresh()`'s expired-refresh-token fallback,
  /// where a login is required unconditionally even though `tokens` is
  /// already populated (with a pair that's no longer valid).
  async fn login_inner(&self, force: bool) -> Result<(), TokenError> {
    let mut guard = self.tokens.lock().await;
    if !force && guard.is_some() {
      return Ok(());
    }

    let retry = ExponentialBackoffRetry::login();
    let pair: TokenPair = retry
      .retry(TokenError::is_retryable, || async {
        let response = self
          .http
          .post(format!("{}/api/oauth2/token", self.auth_base_url))
          .json(&LoginRequest {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            scopes: &self.scopes,
          })
          .send()
          .await?;
        parse_or_classify(response).await
      })
      .await?;

    *guard = Some(Tokens {
      access_token: pair.access_token,
      refresh_token: pair.refresh_token,
    });
    Ok(())
  }

  /// `POST {refresh_token, scopes}` to `/api/oauth2/token_refresh`; on
  /// 401/403 falls back to a full `login()` (`spec.md` §4.1).
  ///
  /// `failed_access_token` is the token whose use triggered this refresh.
  /// The lock is held for the whole round-trip, so a second caller that
  /// was merely queued behind this one's refresh wakes up, sees the
  /// stored access token has already moved on from `failed_access_token`,
  /// and returns without making its own redundant request.
  pub async fn refresh(&self, failed_access_token: &str) -> Result<(), TokenError> {
    let mut guard = self.tokens.lock().await;

    if let Some(tokens) = guard.as_ref() {
      if tokens.access_token != failed_access_token {
        return Ok(());
      }
    }

    let Some(refresh_token) = guard.as_ref().map(|t| t.refresh_token.clone()) else {
      drop(guard);
      return self.login_inner(true).await;
    };

    let retry = ExponentialBackoffRetry::login();
    let result: Result<RefreshedAccessToken, TokenError> = retry
      .retry(TokenError::is_retryable, || async {
        let response = self
          .http
          .post(format!("{}/api/oauth2/token_refresh", self.auth_base_url))
          .json(&RefreshRequest {
            refresh_token: &refresh_token,
            scopes: &self.scopes,
          })
          .send()
          .await?;
        parse_or_classify(response).await
      })
      .await;

    match result {
      Ok(refreshed) => {
        if let Some(tokens) = guard.as_mut() {
          tokens.access_token = refreshed.access_token;
        }
        Ok(())
      }
      Err(TokenError::Authentication(_)) => {
        drop(guard);
        self.login_inner(true).await
      }
      Err(other) => Err(other),
    }
  }

  /// Attaches `Authorization: Bearer <access>` and sends. On 401/403,
  /// refreshes exactly once and retries exactly once; a second 401/403
  /// is a terminal `TokenError::Authentication`.
  pub async fn authorized_call<B: Serialize, R: serde::de::DeserializeOwned>(
    &self,
    method: reqwest::Method,
    url: &str,
    body: &B,
  ) -> Result<R, TokenError> {
    if self.tokens.lock().await.is_none() {
      self.login().await?;
    }

    let access_token = self.current_access_token().await;
    let response = self.send_with_token(method.clone(), url, body, &access_token).await?;

    if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
      self.refresh(&access_token).await?;
      let retried_token = self.current_access_token().await;
      let retried = self.send_with_token(method, url, body, &retried_token).await?;
      if matches!(retried.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(TokenError::Authentication(
          "request unauthorized after refresh+retry".to_string(),
        ));
      }
      return parse_or_classify(retried).await;
    }

    parse_or_classify(response).await
  }

  async fn current_access_token(&self) -> String {
    let guard = self.tokens.lock().await;
    guard.as_ref().map(|t| t.access_token.clone()).unwrap_or_default()
  }

  async fn send_with_token<B: Serialize>(
    &self,
    method: reqwest::Method,
    url: &str,
    body: &B,
    access_token: &str,
  ) -> Result<reqwest::Response, TokenError> {
    Ok(
      self
        .http
        .request(method, url)
        .bearer_auth(access_token)
        .json(body)
        .send()
        .await?,
    )
  }
}

async fn parse_or_classify<R: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<R, TokenError> {
  let status = response.status();
  if status.is_success() {
    return response.json::<R>().await.map_err(TokenError::Transient);
  }

  let body = response.text().await.unwrap_or_default();
  if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
    return Err(TokenError::Authentication(body));
  }
  if status == StatusCode::TOO_MANY_REQUESTS {
    return Err(TokenError::RateLimited);
  }
  Err(TokenError::Api {
    status: status.as_u16(),
    body,
  })
}

#[derive(Serialize)]
struct LoginRequest<'a> {
  client_id: &'a str,
  client_secret: &'a str,
  scopes: &'a [String],
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
  refresh_token: &'a str,
  scopes: &'a [String],
}

#[cfg(test)]
mod tests {
  use super::*;
  use httpmock::prelude::*;
  use serde_json::{json, Value};

  fn client(server: &MockServer) -> Arc<TokenClient> {
    TokenClient::new(Client::new(), server.url(""), "client-1", "secret-1", vec!["backend/read".to_string()])
  }

  #[tokio::test]
  async fn login_stores_the_returned_token_pair() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when.method(POST).path("/api/oauth2/token");
        then
          .status(200)
          .json_body(json!({"access_token": "at-1", "expires_in": 3600, "refresh_token": "rt-1", "token_type": "bearer"}));
      })
      .await;

    let client = client(&server);
    client.login().await.unwrap();

    mock.assert_async().await;
    assert_eq!(client.current_access_token().await, "at-1");
  }

  #[tokio::test]
  async fn a_401_triggers_exactly_one_refresh_then_succeeds() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(POST).path("/api/oauth2/token");
        then
          .status(200)
          .json_body(json!({"access_token": "stale", "expires_in": 3600, "refresh_token": "rt-1", "token_type": "bearer"}));
      })
      .await;
    let refresh_mock = server
      .mock_async(|when, then| {
        when.method(POST).path("/api/oauth2/token_refresh");
        then.status(200).json_body(json!({"access_token": "fresh", "expires_in": 3600}));
      })
      .await;
    let call_mock = server
      .mock_async(|when, then| {
        when.method(POST).path("/resource").header("Authorization", "Bearer stale");
        then.status(401).body("invalid_token");
      })
      .await;
    let retried_mock = server
      .mock_async(|when, then| {
        when.method(POST).path("/resource").header("Authorization", "Bearer fresh");
        then.status(200).json_body(json!({"ok": true}));
      })
      .await;

    let client = client(&server);
    client.login().await.unwrap();

    let result: Value = client
      .authorized_call(reqwest::Method::POST, &server.url("/resource"), &json!({}))
      .await
      .unwrap();

    assert_eq!(result, json!({"ok": true}));
    call_mock.assert_async().await;
    retried_mock.assert_async().await;
    refresh_mock.assert_hits_async(1).await;
  }

  #[tokio::test]
  async fn refresh_is_single_flight_across_concurrent_callers() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(POST).path("/api/oauth2/token");
        then
          .status(200)
          .json_body(json!({"access_token": "stale", "expires_in": 3600, "refresh_token": "rt-1", "token_type": "bearer"}));
      })
      .await;
    let refresh_mock = server
      .mock_async(|when, then| {
        when.method(POST).path("/api/oauth2/token_refresh");
        then.status(200).json_body(json!({"access_token": "fresh", "expires_in": 3600}));
      })
      .await;

    let client = client(&server);
    client.login().await.unwrap();

    // Both callers observed the same `stale` token as having failed; only
    // one of them should actually hit `/token_refresh`.
    let (a, b) = tokio::join!(client.refresh("stale"), client.refresh("stale"));
    a.unwrap();
    b.unwrap();

    refresh_mock.assert_hits_async(1).await;
    assert_eq!(client.current_access_token().await, "fresh");
  }

  #[tokio::test]
  async fn refresh_rejected_with_401_falls_back_to_login() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(POST).path("/api/oauth2/token");
        then
          .status(200)
          .json_body(json!({"access_token": "stale", "expires_in": 3600, "refresh_token": "rt-stale", "token_type": "bearer"}));
      })
      .await;
    server
      .mock_async(|when, then| {
        when.method(POST).path("/api/oauth2/token_refresh");
        then.status(401).body("invalid_token");
      })
      .await;

    let client = client(&server);
    client.login().await.unwrap();
    client.refresh("stale").await.unwrap();

    assert_eq!(client.current_access_token().await, "stale", "fallback login hit the same mock and re-minted the same pair");
  }
}
