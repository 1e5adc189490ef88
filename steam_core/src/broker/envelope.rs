use serde::{Deserialize, Serialize};

/// Broker-level priority, 1-5 per `spec.md` §4.3/§6. Scheduled periodic
/// tasks publish at `Scheduled`; tasks originating from the synchronous
/// HTTP task-submission API publish at `UserInitiated` so they jump the
/// queue ahead of the cron-driven backlog.
///
/// This constant lives here, in the one crate both the Orchestrator and
/// Worker depend on, specifically to avoid the orchestrator/ETL circular
/// import the original implementation had (`spec.md` §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Priority(pub u8);

impl Priority {
  pub const SCHEDULED: Priority = Priority(1);
  pub const USER_INITIATED: Priority = Priority(3);

  /// Our two-tier JetStream transport (`spec.md` SPEC_FULL §4.3a) only
  /// distinguishes "high" (>= 3) from "low" (< 3); it is a coarsening of
  /// the full 1-5 range the wire format still carries.
  pub fn is_high(self) -> bool {
    self.0 >= 3
  }
}

/// Which HTTP-facing service minted a `task_id` and therefore owns the
/// `TaskStatusStore` entry the Worker must report completion back to.
/// Mirrors the RPC `reply_to` header from the AMQP transport this broker
/// replaces (`spec.md` §5), since Backend and Orchestrator both publish
/// onto the same `tasks_for_workers` queue and keep independent stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyTarget {
  Orchestrator,
  Backend,
}

/// Message envelope carried on both `tasks_for_workers` and
/// `tasks_for_orchestrator`: `{task_name, params}` (`spec.md` §4.3/§6).
///
/// `task_id`/`reply_to` are only populated for envelopes minted by an
/// HTTP `POST /tasks/*` submission; scheduler-originated ticks have no
/// caller polling for status and leave both `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
  pub task_name: String,
  pub params: serde_json::Value,
  #[serde(default)]
  pub task_id: Option<String>,
  #[serde(default)]
  pub reply_to: Option<ReplyTarget>,
}

impl TaskEnvelope {
  pub fn new(task_name: impl Into<String>, params: impl Serialize) -> Self {
    Self {
      task_name: task_name.into(),
      params: serde_json::to_value(params).expect("task params must be serializable"),
      task_id: None,
      reply_to: None,
    }
  }

  /// Used by the HTTP task-submission handlers: carries the `task_id`
  /// minted for the caller's `GET /tasks/{task_id}` poll, and which
  /// service's `TaskStatusStore` the Worker should report back to.
  pub fn for_http_submission(task_name: impl Into<String>, params: impl Serialize, task_id: String, reply_to: ReplyTarget) -> Self {
    Self {
      task_name: task_name.into(),
      params: serde_json::to_value(params).expect("task params must be serializable"),
      task_id: Some(task_id),
      reply_to: Some(reply_to),
    }
  }
}

pub mod task_names {
  // Orchestrator -> Worker
  pub const REQUEST_APPS_LIST: &str = "request_apps_list";
  pub const REQUEST_APP_DATA: &str = "request_app_data";
  pub const BULK_REQUEST_FOR_APPS_DATA: &str = "bulk_request_for_apps_data";

  // Worker -> Orchestrator
  pub const ACTUALIZE_APP_LIST: &str = "actualize_app_list";
  pub const UPDATE_APPS_STATUS: &str = "update_apps_status";

  /// Worker -> whichever service minted the `task_id` (`reply_to`).
  pub const TASK_COMPLETED: &str = "task_completed";
}

/// Params for [`TASK_COMPLETED`](task_names::TASK_COMPLETED), published
/// by the Worker once a task carrying a `task_id` reaches a terminal
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompletedParams {
  pub task_id: String,
  pub status: crate::task_status::TaskStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestAppDataParams {
  pub app_id: i64,
  pub country_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRequestParams {
  pub app_ids: Vec<i64>,
  pub country_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActualizeAppListParams {
  pub app_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppsStatusParams {
  pub app_ids: Vec<i64>,
}
