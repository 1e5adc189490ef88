use steam_core::broker::{task_names, ActualizeAppListParams, BulkRequestParams, Priority, RequestAppDataParams, TaskEnvelope, UpdateAppsStatusParams};
use steam_core::models::BackendPackageData;
use steam_core::BrokerError;

use crate::error::AppError;
use crate::state::AppState;

/// `request_apps_list`: fetch Steam's full app-id list and hand it back
/// to the Orchestrator as `actualize_app_list`. Priority is inherited
/// from the envelope that triggered this task so a user-initiated
/// request doesn't get stuck behind the cron backlog on the return hop.
pub async fn request_apps_list(state: AppState, _params: serde_json::Value) -> Result<(), BrokerError> {
  let app_ids = state.steam().get_app_list().await?;

  let envelope = TaskEnvelope::new(task_names::ACTUALIZE_APP_LIST, ActualizeAppListParams { app_ids });
  state
    .orchestrator_queue()
    .publish(Priority::SCHEDULED, &envelope)
    .await
}

/// `request_app_data`: fetch one app's detail for one country, post it
/// to the Backend, then report the id back via `update_apps_status`.
/// Only a successful post advances the id's staleness clock.
pub async fn request_app_data(state: AppState, params: serde_json::Value) -> Result<(), BrokerError> {
  let params: RequestAppDataParams = serde_json::from_value(params).map_err(|e| BrokerError::MalformedEnvelope(e.to_string()))?;

  let (is_success, data) = match state.steam().get_app_detail(params.app_id, &params.country_code).await {
    Ok(data) => (true, data),
    Err(e) => {
      tracing::error!(app_id = params.app_id, error = %e, "request_app_data: upstream fetch failed");
      return Err(e.into());
    }
  };

  state
    .backend()
    .post_package(is_success, data)
    .await
    .map_err(AppError::from)?;

  let envelope = TaskEnvelope::new(
    task_names::UPDATE_APPS_STATUS,
    UpdateAppsStatusParams {
      app_ids: vec![params.app_id],
    },
  );
  state.orchestrator_queue().publish(Priority::SCHEDULED, &envelope).await
}

/// `bulk_request_for_apps_data`: the main fan-out path, in two stages.
///
/// Stage 1 (`spec.md` §4.5 step 2) issues the upstream Steam fetches one
/// at a time, sequentially with respect to the upstream; a fetch failure
/// for one pair is logged and the batch continues (partial failure is
/// acceptable here — it never cancels a sibling pair's fetch).
///
/// Stage 2 posts every successfully-fetched pair to the Backend
/// concurrently under a bounded semaphore; the first hard failure there
/// cancels everything still in flight (first-exception-wins, mirroring
/// `asyncio.wait(..., return_when=FIRST_EXCEPTION)`), but every post that
/// already completed still counts. Only the ids that were actually
/// posted get reported back in `update_apps_status` — this is how
/// partial failure does not falsely freshen stale rows.
pub async fn bulk_request_for_apps_data(state: AppState, params: serde_json::Value) -> Result<(), BrokerError> {
  let params: BulkRequestParams = serde_json::from_value(params).map_err(|e| BrokerError::MalformedEnvelope(e.to_string()))?;

  if params.app_ids.is_empty() {
    return Err(BrokerError::Handled(
      "bulk_request_for_apps_data: empty app_ids batch".to_string(),
    ));
  }

  let mut fetched = Vec::new();
  for &app_id in &params.app_ids {
    for country_code in &params.country_codes {
      match state.steam().get_app_detail(app_id, country_code).await {
        Ok(data) => fetched.push((app_id, data)),
        Err(e) => {
          tracing::warn!(app_id, country_code, error = %e, "bulk_request_for_apps_data: upstream fetch failed, continuing");
        }
      }
    }
  }

  if fetched.is_empty() {
    return Err(BrokerError::Handled(
      "bulk_request_for_apps_data: every pair's upstream fetch failed".to_string(),
    ));
  }

  const MAX_CONCURRENCY: usize = 10;
  let semaphore = std::sync::Arc::new(tokio::sync::Semaphore::new(MAX_CONCURRENCY));
  let mut joins = tokio::task::JoinSet::new();

  for (app_id, data) in fetched {
    let state = state.clone();
    let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");

    joins.spawn(async move {
      let _permit = permit;
      let result = state.backend().post_package(true, data).await.map_err(AppError::from);
      (app_id, result)
    });
  }

  let mut succeeded = std::collections::HashSet::new();
  let mut first_error = None;

  while let Some(outcome) = joins.join_next().await {
    match outcome {
      Ok((app_id, Ok(()))) => {
        succeeded.insert(app_id);
      }
      Ok((app_id, Err(e))) => {
        tracing::warn!(app_id, error = %e, "bulk_request_for_apps_data: backend post failed");
        if first_error.is_none() {
          first_error = Some(e);
          joins.abort_all();
        }
      }
      Err(join_error) => {
        tracing::error!(error = %join_error, "bulk_request_for_apps_data: task panicked");
      }
    }
  }

  if let Some(e) = first_error {
    tracing::error!(
      error = %e,
      succeeded = succeeded.len(),
      "bulk_request_for_apps_data: aborted remaining posts after first backend failure"
    );
  }

  if succeeded.is_empty() {
    return Err(BrokerError::Handled(
      "bulk_request_for_apps_data: every fetched pair's backend post failed".to_string(),
    ));
  }

  let envelope = TaskEnvelope::new(
    task_names::UPDATE_APPS_STATUS,
    UpdateAppsStatusParams {
      app_ids: succeeded.into_iter().collect(),
    },
  );
  state.orchestrator_queue().publish(Priority::SCHEDULED, &envelope).await
}
