use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use steam_core::models::BackendPackage;

use crate::error::AppError;
use crate::state::AppState;

/// `POST /api/v1/package`: the Worker's single ingestion point
/// (`spec.md` §4.5/§4.6). Delegates straight to `PackageStore`, which
/// owns the read-merge-write retry loop.
pub async fn ingest_package(State(state): State<AppState>, Json(package): Json<BackendPackage>) -> Result<StatusCode, AppError> {
  state.package_store().merge_package(package.is_success, &package.data).await?;
  Ok(StatusCode::OK)
}
