use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire object the Worker posts to `POST /api/v1/package` and the Backend
/// ingests via `PackageMerger`. Mirrors the upstream-translation fields
/// listed in `spec.md` §4.5/§4.6; `country_code` plus the observation
/// fields are always present, the rest are only populated for successful
/// observations (unknown for `is_success=false`, per the `backend-ng`
/// original's `AppPackageDataSchema`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendPackageData {
  pub id: i64,
  pub country_code: String,
  pub name: Option<String>,
  #[serde(rename = "type")]
  pub kind: Option<String>,
  pub short_description: Option<String>,
  pub is_free: Option<bool>,
  pub developers: Option<Vec<String>>,
  pub publishers: Option<Vec<String>>,
  pub total_recommendations: Option<u64>,
  pub currency: Option<String>,
  pub price: Option<f64>,
  pub discount: Option<u8>,
  pub timestamp: Option<DateTime<Utc>>,
}

impl BackendPackageData {
  pub fn unavailable(id: i64, country_code: impl Into<String>) -> Self {
    Self {
      id,
      country_code: country_code.into(),
      name: None,
      kind: None,
      short_description: None,
      is_free: None,
      developers: None,
      publishers: None,
      total_recommendations: None,
      currency: None,
      price: None,
      discount: None,
      timestamp: None,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendPackage {
  pub is_success: bool,
  pub data: BackendPackageData,
}
