use steam_core::broker::task_names;
use steam_core::TaskRouter;

use crate::state::AppState;
use crate::tasks;

/// Builds the explicit `task_name -> handler` table for envelopes
/// arriving from the Worker. Replaces the source's reflection-based
/// `receive_task__<name>` dispatch (`spec.md` §9).
pub fn build_task_router() -> TaskRouter<AppState> {
  let mut router = TaskRouter::new();
  router.register(task_names::ACTUALIZE_APP_LIST, |state, params| async move {
    tasks::handle_actualize_app_list(state, params).await
  });
  router.register(task_names::UPDATE_APPS_STATUS, |state, params| async move {
    tasks::handle_update_apps_status(state, params).await
  });
  router.register(task_names::TASK_COMPLETED, |state, params| async move {
    tasks::handle_task_completed(state, params).await
  });
  router
}
