use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use steam_core::broker::WorkQueue;
use steam_core::{Cache, TaskStatusStore};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::registry::AppRegistry;

#[derive(Clone)]
pub struct AppState {
  inner: Arc<AppStateInner>,
}

struct AppStateInner {
  pub config: AppConfig,
  pub registry: AppRegistry,
  pub pool: PgPool,
  /// Orchestrator -> Worker: publish only.
  pub worker_queue: WorkQueue,
  /// Worker -> Orchestrator: receive only.
  pub inbound_queue: WorkQueue,
  pub task_status: TaskStatusStore,
}

impl AppState {
  pub async fn try_new(config: AppConfig) -> Result<Self, AppError> {
    let pool = PgPoolOptions::new()
      .max_connections(10)
      .connect(&config.database.url)
      .await
      .map_err(steam_core::CoreError::from)?;

    let worker_queue = WorkQueue::connect(
      async_nats::connect(&config.nats.url)
        .await
        .map_err(|e| AppError::Config(anyhow::anyhow!("failed to connect to NATS: {e}")))?,
      &config.worker_queue.name,
      Duration::from_secs(config.worker_queue.ttl_seconds),
    )
    .await?;

    let inbound_queue = WorkQueue::connect(
      async_nats::connect(&config.nats.url)
        .await
        .map_err(|e| AppError::Config(anyhow::anyhow!("failed to connect to NATS: {e}")))?,
      &config.inbound_queue.name,
      Duration::from_secs(config.inbound_queue.ttl_seconds),
    )
    .await?;

    let registry = AppRegistry::new(pool.clone());
    let task_status = TaskStatusStore::new(Cache::new(10_000));

    Ok(Self {
      inner: Arc::new(AppStateInner {
        config,
        registry,
        pool,
        worker_queue,
        inbound_queue,
        task_status,
      }),
    })
  }

  pub fn config(&self) -> &AppConfig {
    &self.inner.config
  }

  pub fn registry(&self) -> &AppRegistry {
    &self.inner.registry
  }

  pub fn pool(&self) -> &PgPool {
    &self.inner.pool
  }

  pub fn worker_queue(&self) -> &WorkQueue {
    &self.inner.worker_queue
  }

  pub fn inbound_queue(&self) -> &WorkQueue {
    &self.inner.inbound_queue
  }

  pub fn task_status(&self) -> &TaskStatusStore {
    &self.inner.task_status
  }
}
