pub mod apps;
pub mod health;
pub mod package;
pub mod tasks_api;
