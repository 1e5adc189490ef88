use std::time::Duration;

use steam_core::broker::{task_names, Priority, ReplyTarget, TaskCompletedParams, TaskEnvelope, WorkQueue};
use steam_core::{TaskRouter, TaskStatus};

use crate::state::AppState;

/// Drains the worker-bound queue (Orchestrator -> Worker), dispatching
/// each envelope through the task router and ack/reject-ing based on the
/// outcome. Each task handler carries its own ~40s soft time budget via
/// the upstream rate limiter's natural pacing rather than a hard
/// per-task timeout; `spec.md` §4.4 only constrains throughput, not
/// individual task wall-clock time.
pub async fn run(state: AppState, worker_queue: WorkQueue, router: TaskRouter<AppState>) {
  loop {
    match worker_queue.receive().await {
      Ok(Some(task)) => {
        let result = router.dispatch(state.clone(), &task.envelope).await;
        let status = match &result {
          Ok(()) => TaskStatus::Success,
          Err(_) => TaskStatus::Failure,
        };
        if let Some(task_id) = &task.envelope.task_id {
          report_task_completion(&state, task.envelope.reply_to, task_id, status).await;
        }

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
        tracing::error!(error = %e, "failed to receive from orchestrator queue, backing off");
        tokio::time::sleep(Duration::from_secs(2)).await;
      }
    }
  }
}

/// Reports a terminal task status back to whichever service minted the
/// `task_id` (`spec.md` §4.10 needs this so `GET /tasks/{task_id}`
/// eventually resolves away from `Pending`). Best-effort: a failure here
/// is logged, not propagated, since the task itself already succeeded
/// or failed independently of whether its status report lands.
async fn report_task_completion(state: &AppState, reply_to: Option<ReplyTarget>, task_id: &str, status: TaskStatus) {
  match reply_to {
    Some(ReplyTarget::Backend) => {
      if let Err(e) = state.backend().report_task_status(task_id, status).await {
        tracing::error!(task_id, error = %e, "failed to report task status to backend");
      }
    }
    Some(ReplyTarget::Orchestrator) => {
      let envelope = TaskEnvelope::new(
        task_names::TASK_COMPLETED,
        TaskCompletedParams {
          task_id: task_id.to_string(),
          status,
        },
      );
      if let Err(e) = state.orchestrator_queue().publish(Priority::SCHEDULED, &envelope).await {
        tracing::error!(task_id, error = %e, "failed to report task status to orchestrator");
      }
    }
    None => {}
  }
}
