use anyhow::Result;
use backend::{AppConfig, AppState};
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

  let addr = format!("0.0.0.0:{}", state.config().server.port);
  let app = backend::get_router(state);
  let listener = TcpListener::bind(&addr).await?;

  info!(%addr, "backend listening");
  axum::serve(listener, app.into_make_service()).await?;

  Ok(())
}
