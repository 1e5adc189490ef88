use anyhow::Result;
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::Deserialize;

/// Layered config: `orchestrator.yml` (if present), then `ORCHESTRATOR_`
/// prefixed environment variables override it. Generalizes the source's
/// hand-rolled `AppConfig::load` (which only ever checked a fixed file
/// path or a single env var naming a path) into the figment layering the
/// rest of this corpus uses.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  pub server: ServerConfig,
  pub database: DatabaseConfig,
  pub nats: NatsConfig,
  /// Orchestrator -> Worker direction (`tasks_for_workers`): we publish.
  pub worker_queue: QueueConfig,
  /// Worker -> Orchestrator direction (`tasks_for_orchestrator`): we receive.
  pub inbound_queue: QueueConfig,
  pub scheduler: SchedulerConfig,
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
pub struct SchedulerConfig {
  /// Apps pulled per `bulk_request_for_most_outdated_apps_data` tick.
  pub batch_size: i64,
  /// Cron expression for that tick, default every 5 minutes.
  pub bulk_refresh_cron: String,
  /// Cron expression for `request_apps_list`, default every 5 minutes
  /// (`spec.md` §4.4).
  pub request_apps_list_cron: String,
  pub country_codes: Vec<String>,
}

impl AppConfig {
  pub fn load() -> Result<Self> {
    let config: Self = Figment::new()
      .merge(Yaml::file("orchestrator.yml"))
      .merge(Env::prefixed("ORCHESTRATOR_").split("__"))
      .extract()?;
    Ok(config)
  }
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      batch_size: 20,
      bulk_refresh_cron: "0 */5 * * * *".to_string(),
      request_apps_list_cron: "0 */5 * * * *".to_string(),
      country_codes: vec!["us".to_string()],
    }
  }
}
