pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repo;
pub mod secret;
pub mod state;

pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Builds the Auth Server's OAuth2 surface (`spec.md` §6, "HTTP — Auth").
pub fn get_router(state: AppState) -> Router {
  Router::new()
    .route("/health", get(handlers::health_check))
    .route("/api/oauth2/token", post(handlers::issue_token))
    .route("/api/oauth2/token_refresh", post(handlers::refresh_token))
    .route("/api/oauth2/token_info", post(handlers::introspect))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
