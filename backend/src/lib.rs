pub mod auth_middleware;
pub mod config;
pub mod error;
pub mod filters;
pub mod handlers;
pub mod merger;
pub mod repo;
pub mod search;
pub mod state;

pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Builds the Backend's HTTP surface (`spec.md` §6, "HTTP — Backend").
/// Privileged route groups are nested so `auth_middleware::require_scope`
/// can be layered once per group rather than once per route.
pub fn get_router(state: AppState) -> Router {
  let package_routes = Router::new()
    .route("/api/v1/package", post(handlers::package::ingest_package))
    .layer(from_fn_with_state(state.clone(), auth_middleware::require_scope("backend/package")));

  let write_routes = Router::new()
    .route("/api/v1/apps", post(handlers::apps::create_app))
    .route(
      "/api/v1/apps/{id}",
      axum::routing::patch(handlers::apps::update_app)
        .put(handlers::apps::update_app)
        .delete(handlers::apps::delete_app),
    )
    .layer(from_fn_with_state(state.clone(), auth_middleware::require_scope("backend/write")));

  let task_routes = Router::new()
    .route("/api/v1/tasks/update_app_data", post(handlers::tasks_api::update_app_data))
    .route("/api/v1/tasks/bulk_update_app_data", post(handlers::tasks_api::bulk_update_app_data))
    .route("/api/v1/tasks/update_app_list", post(handlers::tasks_api::update_app_list))
    .route("/api/v1/tasks/{task_id}", get(handlers::tasks_api::get_task_status))
    .layer(from_fn_with_state(state.clone(), auth_middleware::require_scope("orchestrator/tasks")));

  // The Worker's completion callback for tasks this service minted
  // (`reply_to: Backend`); kept out of `task_routes` since it's guarded
  // by a distinct scope (`worker/task-status`, not `orchestrator/tasks`).
  let task_status_callback_routes = Router::new()
    .route("/api/v1/internal/tasks/{task_id}/status", post(handlers::tasks_api::report_task_status))
    .layer(from_fn_with_state(state.clone(), auth_middleware::require_scope("worker/task-status")));

  Router::new()
    .route("/health", get(handlers::health::health_check))
    .route("/api/v1/apps", get(handlers::apps::list_apps))
    .route("/api/v1/apps/{id}", get(handlers::apps::get_app))
    .merge(package_routes)
    .merge(write_routes)
    .merge(task_routes)
    .merge(task_status_callback_routes)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
