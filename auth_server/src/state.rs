use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::repo::ClientRepo;

#[derive(Clone)]
pub struct AppState {
  inner: Arc<AppStateInner>,
}

struct AppStateInner {
  pub config: AppConfig,
  pub repo: ClientRepo,
  #[allow(dead_code)]
  pub pool: PgPool,
  /// Publishes `auth.token_invalidated` so the Backend's `TokenValidator`
  /// cache clears an evicted token immediately instead of serving it for
  /// up to the rest of its TTL (`spec.md` §4.2).
  pub nats: async_nats::Client,
}

impl AppState {
  pub async fn try_new(config: AppConfig) -> Result<Self, AppError> {
    let pool = PgPoolOptions::new()
      .max_connections(10)
      .connect(&config.database.url)
      .await
      .map_err(steam_core::CoreError::from)?;

    let nats = async_nats::connect(&config.nats.url)
      .await
      .map_err(|e| AppError::Config(anyhow::anyhow!("failed to connect to NATS: {e}")))?;

    let repo = ClientRepo::new(pool.clone());

    Ok(Self {
      inner: Arc::new(AppStateInner { config, repo, pool, nats }),
    })
  }

  pub fn config(&self) -> &AppConfig {
    &self.inner.config
  }

  pub fn repo(&self) -> &ClientRepo {
    &self.inner.repo
  }

  pub fn nats(&self) -> &async_nats::Client {
    &self.inner.nats
  }
}
