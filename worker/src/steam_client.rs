use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use steam_core::models::BackendPackageData;

use crate::error::AppError;

type Limiter = RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

/// Rate-limited client for Steam's public storefront API:
/// `ISteamApps/GetAppList` and `appdetails`, the two upstream calls the
/// source drove through Celery's per-task `rate_limit` option. Here the
/// limit lives on the shared client instance instead, since every task
/// handler in this process shares the same upstream budget
/// (`spec.md` §4.4/§4.5).
pub struct SteamApiClient {
  http: Client,
  base_url: String,
  limiter: Arc<Limiter>,
}

impl SteamApiClient {
  pub fn new(http: Client, base_url: impl Into<String>, requests_per_minute: u32) -> Self {
    let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute).expect("rate limit must be nonzero"));
    Self {
      http,
      base_url: base_url.into(),
      limiter: Arc::new(RateLimiter::direct(quota)),
    }
  }

  async fn throttle(&self) {
    self.limiter.until_ready().await;
  }

  /// `GET ISteamApps/GetAppList/v2` -> list of every app id Steam
  /// currently publishes. Backs `request_apps_list`.
  pub async fn get_app_list(&self) -> Result<Vec<i64>, AppError> {
    self.throttle().await;

    let url = format!("{}/ISteamApps/GetAppList/v2", self.base_url);
    let response: AppListResponse = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| AppError::SteamApi(e.to_string()))?
      .json()
      .await
      .map_err(|e| AppError::SteamApi(e.to_string()))?;

    Ok(response.applist.apps.into_iter().map(|a| a.appid).collect())
  }

  /// `GET appdetails?appids={id}&cc={country_code}` -> one app's detail
  /// payload translated straight into the Backend's wire shape. Backs
  /// `request_app_data` and the per-pair fan-out inside
  /// `bulk_request_for_apps_data`.
  pub async fn get_app_detail(&self, app_id: i64, country_code: &str) -> Result<BackendPackageData, AppError> {
    self.throttle().await;

    let url = format!("{}/appdetails", self.base_url);
    let response = self
      .http
      .get(url)
      .query(&[("appids", app_id.to_string().as_str()), ("cc", country_code)])
      .send()
      .await
      .map_err(|e| AppError::SteamApi(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(AppError::SteamApi(format!("appdetails returned status {status}")));
    }

    let body: std::collections::HashMap<String, AppDetailEnvelope> =
      response.json().await.map_err(|e| AppError::SteamApi(e.to_string()))?;

    let envelope = body
      .get(&app_id.to_string())
      .ok_or_else(|| AppError::SteamApi(format!("appdetails response missing app {app_id}")))?;

    if !envelope.success {
      return Ok(BackendPackageData::unavailable(app_id, country_code));
    }

    let data = envelope
      .data
      .clone()
      .ok_or_else(|| AppError::SteamApi(format!("app {app_id} marked success but data missing")))?;

    Ok(convert_to_backend_package(app_id, country_code, data))
  }
}

fn convert_to_backend_package(app_id: i64, country_code: &str, data: SteamAppDetail) -> BackendPackageData {
  let price = data.price_overview.as_ref();
  BackendPackageData {
    id: app_id,
    country_code: country_code.to_string(),
    name: Some(data.name),
    kind: Some(data.kind),
    short_description: Some(data.short_description),
    is_free: Some(data.is_free),
    developers: Some(data.developers),
    publishers: Some(data.publishers),
    total_recommendations: Some(data.recommendations.map(|r| r.total).unwrap_or(0)),
    currency: price.map(|p| p.currency.clone()),
    price: price.map(|p| p.final_price as f64 / 100.0),
    discount: price.map(|p| p.discount_percent as u8),
    timestamp: Some(chrono::Utc::now()),
  }
}

#[derive(Deserialize)]
struct AppListResponse {
  applist: AppList,
}

#[derive(Deserialize)]
struct AppList {
  apps: Vec<AppListEntry>,
}

#[derive(Deserialize)]
struct AppListEntry {
  appid: i64,
}

#[derive(Deserialize, Clone)]
struct AppDetailEnvelope {
  success: bool,
  data: Option<SteamAppDetail>,
}

#[derive(Deserialize, Clone)]
struct SteamAppDetail {
  name: String,
  #[serde(rename = "type")]
  kind: String,
  short_description: String,
  is_free: bool,
  #[serde(default)]
  developers: Vec<String>,
  #[serde(default)]
  publishers: Vec<String>,
  recommendations: Option<SteamRecommendations>,
  price_overview: Option<SteamPriceOverview>,
}

#[derive(Deserialize, Clone)]
struct SteamRecommendations {
  total: u64,
}

#[derive(Deserialize, Clone)]
struct SteamPriceOverview {
  currency: String,
  /// Cents; divided by 100 when translated into `BackendPackageData::price`.
  #[serde(rename = "final")]
  final_price: i64,
  discount_percent: u8,
}
