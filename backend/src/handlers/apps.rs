use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use steam_core::models::App;
use steam_core::CoreError;

use crate::error::AppError;
use crate::filters::ListQuery;
use crate::repo::now;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListParams {
  page: Option<u32>,
  size: Option<u32>,
  main_country: Option<String>,
  search: Option<String>,
  #[serde(flatten)]
  rest: HashMap<String, String>,
}

/// `price_story` compressed to the latest point only, per `spec.md`
/// §4.7: list rows never carry the full history, only the detail view does.
#[derive(Serialize)]
pub struct CompactPrice {
  price: f64,
  discount: u8,
  last_updated: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct AppSummary {
  id: i64,
  name: Option<String>,
  #[serde(rename = "type")]
  kind: Option<String>,
  is_free: Option<bool>,
  prices: HashMap<String, CompactPrice>,
}

impl From<App> for AppSummary {
  fn from(app: App) -> Self {
    let prices = app
      .prices
      .into_iter()
      .filter_map(|(cc, cp)| {
        cp.price_story.first().map(|point| {
          (
            cc,
            CompactPrice {
              price: point.price,
              discount: point.discount,
              last_updated: point.timestamp,
            },
          )
        })
      })
      .collect();

    Self {
      id: app.id,
      name: app.name,
      kind: app.kind,
      is_free: app.is_free,
      prices,
    }
  }
}

#[derive(Serialize)]
pub struct ListResponse {
  items: Vec<AppSummary>,
  page: u32,
  size: u32,
  total: i64,
}

/// `GET /apps` (`spec.md` §4.7). `search=` is resolved against
/// `SearchFilter` first; the returned id set is ANDed into `ListQuery`'s
/// own filter predicate rather than replacing it.
pub async fn list_apps(State(state): State<AppState>, Query(params): Query<ListParams>) -> Result<Json<ListResponse>, AppError> {
  let read_path = &state.config().read_path;
  let page = params.page.unwrap_or(0);
  let size = params.size.unwrap_or(read_path.default_page_size).min(read_path.max_page_size);
  let main_country = params.main_country.as_deref().unwrap_or(&read_path.default_main_country);

  let mut query = ListQuery::parse(&params.rest, main_country)?;
  if let Some(term) = &params.search {
    let ids = state.search().fulltext_search(term, None).await?;
    query = query.with_search_ids(ids);
  }

  let apps = state.repo().list(&query, page as i64, size as i64).await?;
  let total = state.repo().count(&query).await?;

  Ok(Json(ListResponse {
    items: apps.into_iter().map(AppSummary::from).collect(),
    page,
    size,
    total,
  }))
}

#[derive(Deserialize)]
pub struct DetailParams {
  page: Option<u32>,
  size: Option<u32>,
}

#[derive(Serialize)]
pub struct DetailResponse {
  #[serde(flatten)]
  app: App,
}

/// `GET /apps/{id}` (`spec.md` §4.7). Served from the `app_<id>` cache
/// when present; `page`/`size` paginate each country's `price_story`
/// in the response, not in what's cached.
pub async fn get_app(
  State(state): State<AppState>,
  Path(id): Path<i64>,
  Query(params): Query<DetailParams>,
) -> Result<Json<DetailResponse>, AppError> {
  let cache_key = id.to_string();
  let mut app: App = match state.cache().get("app", &cache_key).await {
    Some(app) => app,
    None => {
      let versioned = state
        .repo()
        .get(id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("app {id} not found")))?;
      state
        .cache()
        .set(
          "app",
          &cache_key,
          &versioned.app,
          Duration::from_secs(state.config().read_path.detail_cache_ttl_seconds),
        )
        .await;
      versioned.app
    }
  };

  let page = params.page.unwrap_or(0) as usize;
  let size = params.size.unwrap_or(u32::MAX) as usize;
  for country in app.prices.values_mut() {
    let start = page.saturating_mul(size).min(country.price_story.len());
    let end = start.saturating_add(size).min(country.price_story.len());
    country.price_story = country.price_story[start..end].to_vec();
  }

  Ok(Json(DetailResponse { app }))
}

#[derive(Deserialize)]
pub struct CreateAppRequest {
  id: i64,
  name: Option<String>,
  #[serde(rename = "type")]
  kind: Option<String>,
  short_description: Option<String>,
  is_free: Option<bool>,
  developers: Option<Vec<String>>,
  publishers: Option<Vec<String>>,
  total_recommendations: Option<u64>,
}

/// `POST /apps` (scope `backend/write`): operator-authored document, not
/// routed through `PackageMerger` — no price observation is attached.
pub async fn create_app(State(state): State<AppState>, Json(req): Json<CreateAppRequest>) -> Result<StatusCode, AppError> {
  let mut app = App::new(req.id, now());
  app.name = req.name;
  app.kind = req.kind;
  app.short_description = req.short_description;
  app.is_free = req.is_free;
  app.developers = req.developers;
  app.publishers = req.publishers;
  app.total_recommendations = req.total_recommendations;

  state.repo().insert_new(&app).await?;
  state.cache().clear("app", &app.id.to_string()).await;
  Ok(StatusCode::CREATED)
}

#[derive(Deserialize)]
pub struct UpdateAppRequest {
  name: Option<String>,
  #[serde(rename = "type")]
  kind: Option<String>,
  short_description: Option<String>,
  is_free: Option<bool>,
  developers: Option<Vec<String>>,
  publishers: Option<Vec<String>>,
  total_recommendations: Option<u64>,
}

/// `PATCH|PUT /apps/{id}` (scope `backend/write`). Coalesces like
/// `PackageMerger` rule 5: a field present in the body overwrites, an
/// absent one leaves the stored value untouched.
pub async fn update_app(
  State(state): State<AppState>,
  Path(id): Path<i64>,
  Json(req): Json<UpdateAppRequest>,
) -> Result<StatusCode, AppError> {
  const MAX_RETRIES: u32 = 5;

  for _ in 0..MAX_RETRIES {
    let versioned = state
      .repo()
      .get(id)
      .await?
      .ok_or_else(|| CoreError::NotFound(format!("app {id} not found")))?;
    let mut app = versioned.app;

    if req.name.is_some() {
      app.name = req.name.clone();
    }
    if req.kind.is_some() {
      app.kind = req.kind.clone();
    }
    if req.short_description.is_some() {
      app.short_description = req.short_description.clone();
    }
    if req.is_free.is_some() {
      app.is_free = req.is_free;
    }
    if req.developers.is_some() {
      app.developers = req.developers.clone();
    }
    if req.publishers.is_some() {
      app.publishers = req.publishers.clone();
    }
    if req.total_recommendations.is_some() {
      app.total_recommendations = req.total_recommendations;
    }
    app.updated_at = now();

    if state.repo().replace(&app, versioned.revision).await? {
      state.cache().clear("app", &id.to_string()).await;
      return Ok(StatusCode::OK);
    }
  }

  Err(AppError::MergeConflict(id))
}

/// `DELETE /apps/{id}` (scope `backend/write`).
pub async fn delete_app(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
  let deleted = state.repo().delete(id).await?;
  state.cache().clear("app", &id.to_string()).await;
  if deleted {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(AppError::Core(CoreError::NotFound(format!("app {id} not found"))))
  }
}
