use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};

use crate::state::AppState;
use crate::tasks;

/// The two periodic triggers the source ran as Celery beat tasks:
/// `request_apps_list` and `bulk_request_for_most_outdated_apps_data`,
/// both on the configured cron (`spec.md` §4.4/§4.9, default every 5
/// minutes; the latter also takes a batch size of 20).
pub async fn start(state: AppState) -> anyhow::Result<JobScheduler> {
  let scheduler = JobScheduler::new().await?;

  let list_cron = state.config().scheduler.request_apps_list_cron.clone();
  let list_state = state.clone();
  scheduler
    .add(Job::new_async(list_cron.as_str(), move |_uuid, _lock| {
      let state = list_state.clone();
      Box::pin(async move {
        if let Err(e) = tasks::request_apps_list(&state).await {
          tracing::error!(error = %e, "request_apps_list tick failed");
        }
      })
    })?)
    .await?;

  let bulk_cron = state.config().scheduler.bulk_refresh_cron.clone();
  let bulk_state = Arc::new(state);
  let job_state = bulk_state.clone();
  scheduler
    .add(Job::new_async(bulk_cron.as_str(), move |_uuid, _lock| {
      let state = job_state.clone();
      Box::pin(async move {
        match tasks::bulk_request_for_most_outdated_apps_data(&state).await {
          Ok(n) => tracing::info!(n, "bulk_request_for_most_outdated_apps_data tick dispatched"),
          Err(e) => tracing::error!(error = %e, "bulk_request_for_most_outdated_apps_data tick failed"),
        }
      })
    })?)
    .await?;

  scheduler.start().await?;
  Ok(scheduler)
}
