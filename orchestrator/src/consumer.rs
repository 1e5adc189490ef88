use std::time::Duration;

use steam_core::TaskRouter;

use crate::state::AppState;

/// Drains the orchestrator-bound queue (Worker -> Orchestrator) in a
/// loop, dispatching each envelope through the task router and
/// ack/reject-ing based on the handler outcome. Mirrors
/// `handle_received_task_message`'s ack-on-success,
/// reject-without-requeue-on-failure contract, just without the
/// reflection step.
pub async fn run(state: AppState, router: TaskRouter<AppState>) {
  loop {
    match state.inbound_queue().receive().await {
      Ok(Some(task)) => {
        let result = router.dispatch(state.clone(), &task.envelope).await;
        match result {
          Ok(()) => {
            if let Err(e) = task.ack().await {
              tracing::error!(error = %e, "failed to ack task");
            }
          }
          Err(e) => {
            tracing::error!(task = %task.envelope.task_name, error = %e, "task handler failed, rejecting");
            if let Err(e) = task.reject().await {
              tracing::error!(error = %e, "failed to reject task");
            }
          }
        }
      }
      Ok(None) => {
        tokio::time::sleep(Duration::from_millis(500)).await;
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to receive from worker queue, backing off");
        tokio::time::sleep(Duration::from_secs(2)).await;
      }
    }
  }
}
