use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use steam_core::broker::WorkQueue;
use steam_core::{Cache, TaskStatusStore, TokenValidator};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::merger::PackageStore;
use crate::repo::AppRepo;
use crate::search::{DisabledSearchFilter, RemoteSearchFilter, SearchFilter};

#[derive(Clone)]
pub struct AppState {
  inner: Arc<AppStateInner>,
}

struct AppStateInner {
  pub config: AppConfig,
  pub repo: AppRepo,
  #[allow(dead_code)]
  pub pool: PgPool,
  pub cache: Cache,
  pub task_status: TaskStatusStore,
  pub token_validator: TokenValidator,
  /// Backend -> Worker, the same task-submission direction the
  /// Orchestrator's HTTP API publishes on.
  pub worker_queue: WorkQueue,
  pub search: Arc<dyn SearchFilter>,
  pub package_store: PackageStore,
}

impl AppState {
  pub async fn try_new(config: AppConfig) -> Result<Self, AppError> {
    let pool = PgPoolOptions::new()
      .max_connections(10)
      .connect(&config.database.url)
      .await
      .map_err(steam_core::CoreError::from)?;

    let http = Client::new();
    let cache = Cache::new(10_000);
    let repo = AppRepo::new(pool.clone());
    let task_status = TaskStatusStore::new(cache.clone());
    let token_validator = TokenValidator::new(http.clone(), config.auth.base_url.clone(), cache.clone());

    let worker_queue = WorkQueue::connect(
      async_nats::connect(&config.nats.url)
        .await
        .map_err(|e| AppError::Config(anyhow::anyhow!("failed to connect to NATS: {e}")))?,
      &config.worker_queue.name,
      Duration::from_secs(config.worker_queue.ttl_seconds),
    )
    .await?;

    let search: Arc<dyn SearchFilter> = match &config.search.base_url {
      Some(base_url) => Arc::new(RemoteSearchFilter::new(http.clone(), base_url.clone())),
      None => Arc::new(DisabledSearchFilter),
    };

    let package_store = PackageStore::new(repo.clone(), cache.clone());

    let invalidation_nats = async_nats::connect(&config.nats.url)
      .await
      .map_err(|e| AppError::Config(anyhow::anyhow!("failed to connect to NATS: {e}")))?;
    tokio::spawn(steam_core::cache_invalidation::run_invalidation_listener(invalidation_nats, cache.clone()));

    Ok(Self {
      inner: Arc::new(AppStateInner {
        config,
        repo,
        pool,
        cache,
        task_status,
        token_validator,
        worker_queue,
        search,
        package_store,
      }),
    })
  }

  pub fn config(&self) -> &AppConfig {
    &self.inner.config
  }

  pub fn repo(&self) -> &AppRepo {
    &self.inner.repo
  }

  pub fn cache(&self) -> &Cache {
    &self.inner.cache
  }

  pub fn task_status(&self) -> &TaskStatusStore {
    &self.inner.task_status
  }

  pub fn token_validator(&self) -> &TokenValidator {
    &self.inner.token_validator
  }

  pub fn worker_queue(&self) -> &WorkQueue {
    &self.inner.worker_queue
  }

  pub fn search(&self) -> &Arc<dyn SearchFilter> {
    &self.inner.search
  }

  pub fn package_store(&self) -> &PackageStore {
    &self.inner.package_store
  }
}
