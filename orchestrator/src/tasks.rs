use steam_core::broker::{task_names, ActualizeAppListParams, Priority, TaskCompletedParams, TaskEnvelope, UpdateAppsStatusParams};
use steam_core::models::AppRegistryRow;
use steam_core::BrokerError;

use crate::state::AppState;

/// Pushes a `request_apps_list` envelope to the Worker queue. Triggered
/// by the scheduler's `request_apps_list` cron tick (`spec.md` §4.9).
pub async fn request_apps_list(state: &AppState) -> Result<(), BrokerError> {
  let envelope = TaskEnvelope::new(task_names::REQUEST_APPS_LIST, serde_json::json!({}));
  state
    .worker_queue()
    .publish(Priority::SCHEDULED, &envelope)
    .await
}

/// Picks the `batch_size` stalest apps from the registry and pushes one
/// `bulk_request_for_apps_data` envelope covering all of them, across
/// every configured country code — the Rust equivalent of
/// `bulk_request_for_most_outdated_apps_data`.
pub async fn bulk_request_for_most_outdated_apps_data(state: &AppState) -> Result<usize, BrokerError> {
  let rows: Vec<AppRegistryRow> = state
    .registry()
    .stalest_n(state.config().scheduler.batch_size)
    .await
    .map_err(|e| BrokerError::Connection(e.to_string()))?;

  if rows.is_empty() {
    return Ok(0);
  }

  let app_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
  let envelope = TaskEnvelope::new(
    task_names::BULK_REQUEST_FOR_APPS_DATA,
    serde_json::json!({
      "app_ids": app_ids,
      "country_codes": state.config().scheduler.country_codes,
    }),
  );
  state.worker_queue().publish(Priority::SCHEDULED, &envelope).await?;
  Ok(app_ids.len())
}

/// Handles an `actualize_app_list` envelope coming back from the Worker:
/// registers any ids Steam's applist exposes that the registry doesn't
/// know about yet, seeded at the Unix epoch so they are immediately
/// eligible for the next stalest-first batch.
pub async fn handle_actualize_app_list(state: AppState, params: serde_json::Value) -> Result<(), BrokerError> {
  let params: ActualizeAppListParams =
    serde_json::from_value(params).map_err(|e| BrokerError::MalformedEnvelope(e.to_string()))?;

  if params.app_ids.is_empty() {
    return Err(BrokerError::Handled(
      "actualize_app_list: no app_ids provided in task context".to_string(),
    ));
  }

  let inserted = state
    .registry()
    .insert_missing(&params.app_ids)
    .await
    .map_err(|e| BrokerError::Handled(e.to_string()))?;

  tracing::debug!(inserted, "actualize_app_list: registered new apps");
  Ok(())
}

/// Handles an `update_apps_status` envelope: advances `last_updated` for
/// every id the Worker just (re)fetched successfully.
pub async fn handle_update_apps_status(state: AppState, params: serde_json::Value) -> Result<(), BrokerError> {
  let params: UpdateAppsStatusParams =
    serde_json::from_value(params).map_err(|e| BrokerError::MalformedEnvelope(e.to_string()))?;

  if params.app_ids.is_empty() {
    return Err(BrokerError::Handled(
      "update_apps_status: no app_ids provided in task context".to_string(),
    ));
  }

  state
    .registry()
    .advance(&params.app_ids)
    .await
    .map_err(|e| BrokerError::Handled(e.to_string()))?;

  tracing::debug!(count = params.app_ids.len(), "update_apps_status: advanced last_updated");
  Ok(())
}

/// Handles a `task_completed` envelope: the Worker reporting back on a
/// `task_id` minted by this service's own `POST /tasks/*` handlers.
pub async fn handle_task_completed(state: AppState, params: serde_json::Value) -> Result<(), BrokerError> {
  let params: TaskCompletedParams = serde_json::from_value(params).map_err(|e| BrokerError::MalformedEnvelope(e.to_string()))?;

  state.task_status().mark(&params.task_id, params.status).await;
  Ok(())
}
