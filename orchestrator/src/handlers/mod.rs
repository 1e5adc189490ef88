mod health;
mod tasks_api;

pub use health::health_check;
pub use tasks_api::{bulk_update_app_data, get_task_status, update_app_data, update_app_list};
