pub mod config;
pub mod consumer;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod router;
pub mod scheduler;
pub mod state;
pub mod tasks;

pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;

/// Builds the orchestrator's HTTP surface: task submission + polling
/// endpoints mirroring the Backend's (`spec.md` §6, "HTTP — Orchestrator:
/// mirrors task endpoints").
pub fn get_router(state: AppState) -> Router {
  Router::new()
    .route("/health", get(handlers::health_check))
    .route("/api/v1/tasks/update_app_data", post(handlers::update_app_data))
    .route("/api/v1/tasks/bulk_update_app_data", post(handlers::bulk_update_app_data))
    .route("/api/v1/tasks/update_app_list", post(handlers::update_app_list))
    .route("/api/v1/tasks/{task_id}", get(handlers::get_task_status))
    .with_state(state)
}
