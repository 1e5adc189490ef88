use anyhow::Result;
use orchestrator::{consumer, router, scheduler, AppConfig, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(fmt::layer().json())
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let config = AppConfig::load()?;
  let state = AppState::try_new(config).await?;

  let task_router = router::build_task_router();
  tokio::spawn(consumer::run(state.clone(), task_router));

  let _scheduler = scheduler::start(state.clone()).await?;

  let addr = format!("0.0.0.0:{}", state.config().server.port);
  let app = orchestrator::get_router(state);
  let listener = TcpListener::bind(&addr).await?;

  info!(%addr, "orchestrator listening");
  axum::serve(listener, app.into_make_service()).await?;

  Ok(())
}
