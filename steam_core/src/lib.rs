pub mod broker;
pub mod cache;
pub mod cache_invalidation;
pub mod error;
pub mod models;
pub mod retry;
pub mod task_router;
pub mod task_status;
pub mod token_client;
pub mod token_validator;

pub use cache::Cache;
pub use error::{BrokerError, CoreError, TokenError};
pub use retry::ExponentialBackoffRetry;
pub use task_router::TaskRouter;
pub use task_status::{TaskStatus, TaskStatusStore};
pub use token_client::TokenClient;
pub use token_validator::{TokenValidator, ValidationError};
