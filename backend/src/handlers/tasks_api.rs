use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use steam_core::broker::{task_names, BulkRequestParams, Priority, RequestAppDataParams, ReplyTarget, TaskEnvelope};
use steam_core::TaskStatus;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct TaskSubmittedResponse {
  task_id: String,
}

#[derive(Deserialize)]
pub struct UpdateAppDataRequest {
  app_id: i64,
  country_code: String,
}

/// `POST /api/v1/tasks/update_app_data` -> `{task_id}` (`spec.md` §6).
/// The Backend publishes to the same `tasks_for_workers` queue the
/// Orchestrator's own HTTP task endpoints use, at `UserInitiated`
/// priority so these jump ahead of the cron-driven backlog.
pub async fn update_app_data(
  State(state): State<AppState>,
  Json(req): Json<UpdateAppDataRequest>,
) -> Result<Json<TaskSubmittedResponse>, AppError> {
  let task_id = state.task_status().submit().await;
  let envelope = TaskEnvelope::for_http_submission(
    task_names::REQUEST_APP_DATA,
    RequestAppDataParams {
      app_id: req.app_id,
      country_code: req.country_code,
    },
    task_id.clone(),
    ReplyTarget::Backend,
  );
  state.worker_queue().publish(Priority::USER_INITIATED, &envelope).await?;
  Ok(Json(TaskSubmittedResponse { task_id }))
}

#[derive(Deserialize)]
pub struct BulkUpdateAppDataRequest {
  app_ids: Vec<i64>,
  country_codes: Vec<String>,
}

/// `POST /api/v1/tasks/bulk_update_app_data` -> `{task_id}`.
pub async fn bulk_update_app_data(
  State(state): State<AppState>,
  Json(req): Json<BulkUpdateAppDataRequest>,
) -> Result<Json<TaskSubmittedResponse>, AppError> {
  let task_id = state.task_status().submit().await;
  let envelope = TaskEnvelope::for_http_submission(
    task_names::BULK_REQUEST_FOR_APPS_DATA,
    BulkRequestParams {
      app_ids: req.app_ids,
      country_codes: req.country_codes,
    },
    task_id.clone(),
    ReplyTarget::Backend,
  );
  state.worker_queue().publish(Priority::USER_INITIATED, &envelope).await?;
  Ok(Json(TaskSubmittedResponse { task_id }))
}

/// `POST /api/v1/tasks/update_app_list` -> `{task_id}`.
pub async fn update_app_list(State(state): State<AppState>) -> Result<Json<TaskSubmittedResponse>, AppError> {
  let task_id = state.task_status().submit().await;
  let envelope = TaskEnvelope::for_http_submission(
    task_names::REQUEST_APPS_LIST,
    serde_json::json!({}),
    task_id.clone(),
    ReplyTarget::Backend,
  );
  state.worker_queue().publish(Priority::USER_INITIATED, &envelope).await?;
  Ok(Json(TaskSubmittedResponse { task_id }))
}

#[derive(Serialize)]
pub struct TaskStatusResponse {
  status: TaskStatus,
}

/// `GET /api/v1/tasks/{task_id}` -> `{status}`. Unknown ids report
/// `Pending`, the acknowledged ambiguity in `spec.md` §4.10.
pub async fn get_task_status(State(state): State<AppState>, Path(task_id): Path<String>) -> Json<TaskStatusResponse> {
  let status = state.task_status().get(&task_id).await;
  Json(TaskStatusResponse { status })
}

#[derive(Deserialize)]
pub struct ReportTaskStatusRequest {
  status: TaskStatus,
}

/// `POST /api/v1/internal/tasks/{task_id}/status`: the Worker's callback
/// for a task whose envelope carried `reply_to: Backend`. Not reachable
/// from outside the cluster — guarded by the `worker/task-status` scope,
/// distinct from the public `orchestrator/tasks` group.
pub async fn report_task_status(
  State(state): State<AppState>,
  Path(task_id): Path<String>,
  Json(req): Json<ReportTaskStatusRequest>,
) -> axum::http::StatusCode {
  state.task_status().mark(&task_id, req.status).await;
  axum::http::StatusCode::OK
}
