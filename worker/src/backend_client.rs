use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use steam_core::models::{BackendPackage, BackendPackageData};
use steam_core::{TaskStatus, TokenClient, TokenError};

/// Thin wrapper over `TokenClient::authorized_call` for the Worker's two
/// outbound calls to the Backend: `POST /api/v1/package`
/// (`spec.md` §4.5/§6, scope `backend/package`) and the `task_id`
/// completion callback (scope `worker/task-status`) for tasks the
/// Backend itself submitted.
pub struct BackendClient {
  token_client: Arc<TokenClient>,
  base_url: String,
}

#[derive(Serialize)]
struct ReportTaskStatusRequest {
  status: TaskStatus,
}

impl BackendClient {
  pub fn new(token_client: Arc<TokenClient>, base_url: impl Into<String>) -> Self {
    Self {
      token_client,
      base_url: base_url.into(),
    }
  }

  pub async fn post_package(&self, is_success: bool, data: BackendPackageData) -> Result<(), TokenError> {
    let package = BackendPackage { is_success, data };
    let url = format!("{}/api/v1/package", self.base_url);
    let _: serde_json::Value = self.token_client.authorized_call(Method::POST, &url, &package).await?;
    Ok(())
  }

  pub async fn report_task_status(&self, task_id: &str, status: TaskStatus) -> Result<(), TokenError> {
    let url = format!("{}/api/v1/internal/tasks/{task_id}/status", self.base_url);
    let _: serde_json::Value = self
      .token_client
      .authorized_call(Method::POST, &url, &ReportTaskStatusRequest { status })
      .await?;
    Ok(())
  }
}
