use anyhow::Result;
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::Deserialize;

/// Layered config: `auth_server.yml` (if present), then `AUTH_SERVER_`
/// prefixed environment variables override it, the same figment layering
/// `orchestrator`/`worker` use.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  pub server: ServerConfig,
  pub database: DatabaseConfig,
  pub nats: NatsConfig,
  pub tokens: TokenConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
  pub url: String,
}

/// Used only to publish on `auth.token_invalidated` (`spec.md` §4.2)
/// when the LRU eviction in `ClientRepo::issue_access_token` deactivates
/// a token out from under a remote `TokenValidator`'s cache.
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
  pub url: String,
}

/// Mirrors the source's `{OAUTH2_SERVER_*, *_TOKEN_EXPIRE_SECONDS,
/// MAX_ACCESS_TOKENS_PER_CLIENT}` environment section.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
  pub access_token_expire_seconds: i64,
  pub refresh_token_expire_seconds: i64,
  pub access_token_byte_length: usize,
  pub refresh_token_byte_length: usize,
  /// Redesigned per `spec.md` §9: the oldest active token is evicted
  /// (LRU) once a client reaches this count, instead of deactivating
  /// every active token.
  pub max_access_tokens_per_client: i64,
}

impl AppConfig {
  pub fn load() -> Result<Self> {
    let config: Self = Figment::new()
      .merge(Yaml::file("auth_server.yml"))
      .merge(Env::prefixed("AUTH_SERVER_").split("__"))
      .extract()?;
    Ok(config)
  }
}

impl Default for TokenConfig {
  fn default() -> Self {
    Self {
      access_token_expire_seconds: 3600,
      refresh_token_expire_seconds: 30 * 24 * 3600,
      access_token_byte_length: 32,
      refresh_token_byte_length: 32,
      max_access_tokens_per_client: 5,
    }
  }
}
