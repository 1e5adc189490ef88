use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use steam_core::broker::WorkQueue;
use steam_core::TokenClient;

use crate::backend_client::BackendClient;
use crate::config::AppConfig;
use crate::steam_client::SteamApiClient;

#[derive(Clone)]
pub struct AppState {
  inner: Arc<AppStateInner>,
}

struct AppStateInner {
  pub config: AppConfig,
  pub steam: SteamApiClient,
  pub backend: BackendClient,
  /// Worker -> Orchestrator: publish only. The inbound (receive) queue
  /// is owned by the consumer loop directly, not threaded through state,
  /// since no task handler ever needs to read from it.
  pub orchestrator_queue: WorkQueue,
}

impl AppState {
  pub async fn try_new(config: AppConfig) -> anyhow::Result<Self> {
    let http = Client::new();

    let steam = SteamApiClient::new(
      http.clone(),
      config.steam.store_api_base_url.clone(),
      config.steam.requests_per_minute,
    );

    let token_client = TokenClient::new(
      http.clone(),
      config.auth.base_url.clone(),
      config.auth.client_id.clone(),
      config.auth.client_secret.clone(),
      vec!["backend/package".to_string(), "worker/task-status".to_string()],
    );
    let backend = BackendClient::new(token_client, config.backend.base_url.clone());

    let nats_client = async_nats::connect(&config.nats.url).await?;
    let orchestrator_queue = WorkQueue::connect(
      nats_client,
      &config.orchestrator_queue.name,
      Duration::from_secs(config.orchestrator_queue.ttl_seconds),
    )
    .await?;

    Ok(Self {
      inner: Arc::new(AppStateInner {
        config,
        steam,
        backend,
        orchestrator_queue,
      }),
    })
  }

  pub fn config(&self) -> &AppConfig {
    &self.inner.config
  }

  pub fn steam(&self) -> &SteamApiClient {
    &self.inner.steam
  }

  pub fn backend(&self) -> &BackendClient {
    &self.inner.backend
  }

  pub fn orchestrator_queue(&self) -> &WorkQueue {
    &self.inner.orchestrator_queue
  }
}
