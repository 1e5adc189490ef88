use anyhow::Result;
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::Deserialize;

/// Layered config: `backend.yml` (if present), then `BACKEND_` prefixed
/// environment variables override it — the same figment layering
/// `orchestrator`/`worker`/`auth_server` use.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  pub server: ServerConfig,
  pub database: DatabaseConfig,
  pub nats: NatsConfig,
  /// Backend -> Worker, the same queue the Orchestrator's own
  /// `update_app_data`/`bulk_update_app_data`/`update_app_list` HTTP
  /// handlers publish to (`spec.md` §6 lists identical task endpoints
  /// under both "HTTP — Backend" and "HTTP — Orchestrator").
  pub worker_queue: QueueConfig,
  pub auth: AuthConfig,
  pub read_path: ReadPathConfig,
  pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
  pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
  pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
  pub name: String,
  pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
  pub base_url: String,
}

/// The external full-text index `SearchFilter` delegates to
/// (`spec.md` §4.8). `base_url: None` disables `search=` filtering —
/// callers get a validation error rather than a silent empty result.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
  pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadPathConfig {
  pub default_page_size: u32,
  pub max_page_size: u32,
  pub detail_cache_ttl_seconds: u64,
  pub default_main_country: String,
}

impl AppConfig {
  pub fn load() -> Result<Self> {
    let config: Self = Figment::new()
      .merge(Yaml::file("backend.yml"))
      .merge(Env::prefixed("BACKEND_").split("__"))
      .extract()?;
    Ok(config)
  }
}

impl Default for ReadPathConfig {
  fn default() -> Self {
    Self {
      default_page_size: 20,
      max_page_size: 100,
      detail_cache_ttl_seconds: 60,
      default_main_country: "us".to_string(),
    }
  }
}
