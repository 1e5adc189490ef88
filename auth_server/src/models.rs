use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Mirrors `auth/auth/models/clients.py::Client`, minus the ORM
/// relationship fields resolved separately via `ClientRepo`.
#[derive(Debug, Clone, FromRow)]
pub struct Client {
  pub pk: i64,
  pub id: String,
  pub secret: String,
  #[allow(dead_code)]
  pub name: String,
  #[allow(dead_code)]
  pub description: String,
}

/// `auth/auth/models/permissions.py::Scope`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Scope {
  pub id: i64,
  pub name: String,
  #[allow(dead_code)]
  pub description: String,
  #[allow(dead_code)]
  pub action: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct AccessTokenRow {
  pub token: String,
  #[allow(dead_code)]
  pub client_pk: i64,
  pub is_active: bool,
  pub issued_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}
