pub mod envelope;
pub mod queue;

pub use envelope::{
  task_names, ActualizeAppListParams, BulkRequestParams, Priority, RequestAppDataParams, ReplyTarget, TaskCompletedParams,
  TaskEnvelope, UpdateAppsStatusParams,
};
pub use queue::{ReceivedTask, WorkQueue};
