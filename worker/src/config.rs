use anyhow::Result;
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  pub nats: NatsConfig,
  /// Orchestrator -> Worker (`tasks_for_workers`): we receive.
  pub inbound_queue: QueueConfig,
  /// Worker -> Orchestrator (`tasks_for_orchestrator`): we publish.
  pub orchestrator_queue: QueueConfig,
  pub backend: BackendConfig,
  pub auth: AuthConfig,
  pub steam: SteamConfig,
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
pub struct BackendConfig {
  pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
  pub base_url: String,
  pub client_id: String,
  pub client_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SteamConfig {
  pub store_api_base_url: String,
  /// Requests-per-minute ceiling Steam's unauthenticated storefront API
  /// tolerates before throttling (`spec.md` §4.4): 39, one under the
  /// commonly observed 40/min wall, with a burst of 1 since Steam does
  /// not document any burst tolerance.
  #[serde(default = "default_requests_per_minute")]
  pub requests_per_minute: u32,
  pub default_country_code: String,
  #[serde(default = "default_country_bundle")]
  pub default_country_bundle: Vec<String>,
}

fn default_requests_per_minute() -> u32 {
  39
}

fn default_country_bundle() -> Vec<String> {
  vec!["us".to_string()]
}

impl AppConfig {
  pub fn load() -> Result<Self> {
    let config: Self = Figment::new()
      .merge(Yaml::file("worker.yml"))
      .merge(Env::prefixed("WORKER_").split("__"))
      .extract()?;
    Ok(config)
  }
}
