use std::time::Duration;

use anyhow::Result;
use steam_core::broker::WorkQueue;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use worker::{consumer, router, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(fmt::layer().json())
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let config = AppConfig::load()?;
  let state = AppState::try_new(config.clone()).await?;

  let inbound_queue = WorkQueue::connect(
    async_nats::connect(&config.nats.url).await?,
    &config.inbound_queue.name,
    Duration::from_secs(config.inbound_queue.ttl_seconds),
  )
  .await?;

  let task_router = router::build_task_router();

  info!("worker starting consumer loop");
  consumer::run(state, inbound_queue, task_router).await;

  Ok(())
}
