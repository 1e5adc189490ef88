use steam_core::broker::task_names;
use steam_core::TaskRouter;

use crate::state::AppState;
use crate::tasks;

/// Explicit `task_name -> handler` table for envelopes arriving from the
/// Orchestrator, replacing the source's `receive_task__<name>`
/// reflection-based dispatch (`spec.md` §9).
pub fn build_task_router() -> TaskRouter<AppState> {
  let mut router = TaskRouter::new();
  router.register(task_names::REQUEST_APPS_LIST, |state, params| async move {
    tasks::request_apps_list(state, params).await
  });
  router.register(task_names::REQUEST_APP_DATA, |state, params| async move {
    tasks::request_app_data(state, params).await
  });
  router.register(task_names::BULK_REQUEST_FOR_APPS_DATA, |state, params| async move {
    tasks::bulk_request_for_apps_data(state, params).await
  });
  router
}
