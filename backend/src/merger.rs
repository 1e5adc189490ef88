use chrono::{DateTime, Utc};
use steam_core::models::app::{CountryPrice, PricePoint};
use steam_core::models::package::BackendPackageData;
use steam_core::models::App;
use steam_core::Cache;

use crate::error::AppError;
use crate::repo::AppRepo;

/// `PackageMerger`'s IO half: read-mutate-conditional-write with bounded
/// retry on optimistic-concurrency conflict (`spec.md` §4.6, "bounded to
/// 5 retries before surfacing 503"), and the cache invalidation hook
/// ("after any mutation, clear `app_<id>` in the read cache").
pub struct PackageStore {
  repo: AppRepo,
  cache: Cache,
}

const MAX_MERGE_RETRIES: u32 = 5;

impl PackageStore {
  pub fn new(repo: AppRepo, cache: Cache) -> Self {
    Self { repo, cache }
  }

  pub async fn merge_package(&self, is_success: bool, data: &BackendPackageData) -> Result<(), AppError> {
    for _ in 0..MAX_MERGE_RETRIES {
      let existing = self.repo.get(data.id).await?;
      let now = Utc::now();

      match existing {
        None => {
          let Some(app) = apply_package(None, is_success, data, now) else {
            return Ok(()); // rule 2: failed observation, unknown app — no-op
          };
          match self.repo.insert_new(&app).await {
            Ok(()) => {
              self.cache.clear("app", &data.id.to_string()).await;
              return Ok(());
            }
            Err(steam_core::CoreError::Conflict(_)) => continue, // someone else inserted first; re-read and retry
            Err(other) => return Err(other.into()),
          }
        }
        Some(versioned) => {
          // `existing` is `Some`, so `apply_package` always returns `Some`.
          let merged = apply_package(Some(versioned.app), is_success, data, now).expect("merge of an existing app is never a no-op");
          if self.repo.replace(&merged, versioned.revision).await? {
            self.cache.clear("app", &data.id.to_string()).await;
            return Ok(());
          }
          // revision mismatch: someone else mutated the row, retry
        }
      }
    }

    Err(AppError::MergeConflict(data.id))
  }
}

/// Pure in-memory half of the idempotent price-history merge
/// (`spec.md` §4.6, rules 1-5). Kept free of any `sqlx`/IO so it can be
/// exercised directly in tests without a database
/// (`SPEC_FULL.md` §8, "Test tooling").
///
/// Returns `None` when the merge is a documented no-op (an unsuccessful
/// observation for an app the store has never heard of); otherwise
/// returns the document that should be persisted.
pub fn apply_package(existing: Option<App>, is_success: bool, data: &BackendPackageData, now: DateTime<Utc>) -> Option<App> {
  match (is_success, existing) {
    (false, None) => None,
    (false, Some(mut app)) => {
      let entry = app.prices.entry(data.country_code.clone()).or_default();
      entry.is_available = false;
      app.updated_at = now;
      Some(app)
    }
    (true, None) => Some(new_document(data, now)),
    (true, Some(app)) => Some(merge_into(app, data, now)),
  }
}

fn new_document(data: &BackendPackageData, now: DateTime<Utc>) -> App {
  let mut app = App::new(data.id, now);
  apply_common_fields(&mut app, data);

  let mut entry = CountryPrice {
    is_available: true,
    currency: data.currency.clone(),
    price_story: Vec::new(),
  };
  if let Some(point) = price_point(data, now) {
    entry.record_point(point, false);
  }
  app.prices.insert(data.country_code.clone(), entry);

  app
}

fn merge_into(mut app: App, data: &BackendPackageData, now: DateTime<Utc>) -> App {
  apply_common_fields(&mut app, data);

  let entry = app.prices.entry(data.country_code.clone()).or_default();
  let reactivated = !entry.is_available;
  entry.is_available = true;
  if data.currency.is_some() {
    entry.currency = data.currency.clone();
  }
  if let Some(point) = price_point(data, now) {
    entry.record_point(point, reactivated);
  }

  app.updated_at = now;
  app
}

/// Coalesce: take the incoming value iff non-null, leaving the existing
/// value untouched otherwise (`spec.md` §4.6 rule 5).
fn apply_common_fields(app: &mut App, data: &BackendPackageData) {
  if data.name.is_some() {
    app.name = data.name.clone();
  }
  if data.kind.is_some() {
    app.kind = data.kind.clone();
  }
  if data.short_description.is_some() {
    app.short_description = data.short_description.clone();
  }
  if data.is_free.is_some() {
    app.is_free = data.is_free;
  }
  if data.developers.is_some() {
    app.developers = data.developers.clone();
  }
  if data.publishers.is_some() {
    app.publishers = data.publishers.clone();
  }
  if data.total_recommendations.is_some() {
    app.total_recommendations = data.total_recommendations;
  }
}

fn price_point(data: &BackendPackageData, now: DateTime<Utc>) -> Option<PricePoint> {
  data.price.map(|price| PricePoint {
    timestamp: data.timestamp.unwrap_or(now),
    price,
    discount: data.discount.unwrap_or(0),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap()
  }

  fn package(id: i64, cc: &str, price: Option<f64>) -> BackendPackageData {
    BackendPackageData {
      id,
      country_code: cc.to_string(),
      name: Some("Half-Life 3".to_string()),
      kind: Some("game".to_string()),
      short_description: Some("at last".to_string()),
      is_free: Some(false),
      developers: Some(vec!["Valve".to_string()]),
      publishers: Some(vec!["Valve".to_string()]),
      total_recommendations: Some(100),
      currency: Some("USD".to_string()),
      price,
      discount: Some(0),
      timestamp: Some(ts(1)),
    }
  }

  #[test]
  fn failed_observation_for_unknown_app_is_a_no_op() {
    let data = package(10, "us", None);
    assert!(apply_package(None, false, &data, ts(2)).is_none());
  }

  #[test]
  fn failed_observation_marks_existing_country_unavailable_without_a_point() {
    let mut app = App::new(10, ts(1));
    app.prices.insert(
      "us".to_string(),
      CountryPrice {
        is_available: true,
        currency: Some("USD".to_string()),
        price_story: vec![PricePoint {
          timestamp: ts(1),
          price: 19.99,
          discount: 0,
        }],
      },
    );

    let data = package(10, "us", None);
    let merged = apply_package(Some(app), false, &data, ts(2)).unwrap();

    let cc = &merged.prices["us"];
    assert!(!cc.is_available);
    assert_eq!(cc.price_story.len(), 1);
    assert_eq!(merged.updated_at, ts(2));
  }

  #[test]
  fn successful_observation_for_unknown_app_creates_a_document() {
    let data = package(10, "us", Some(19.99));
    let app = apply_package(None, true, &data, ts(1)).unwrap();

    assert_eq!(app.id, 10);
    assert_eq!(app.name.as_deref(), Some("Half-Life 3"));
    assert_eq!(app.prices["us"].price_story.len(), 1);
    assert!(app.invariant_updated_at_is_watermark());
  }

  #[test]
  fn unchanged_price_does_not_append_a_new_point() {
    let data = package(10, "us", Some(19.99));
    let app = apply_package(None, true, &data, ts(1)).unwrap();

    let repeat = package(10, "us", Some(19.99));
    let merged = apply_package(Some(app), true, &repeat, ts(2)).unwrap();

    assert_eq!(merged.prices["us"].price_story.len(), 1);
    assert_eq!(merged.updated_at, ts(2), "updated_at still bumps on a no-change observation");
  }

  #[test]
  fn changed_price_appends_and_resorts_descending() {
    let data = package(10, "us", Some(19.99));
    let app = apply_package(None, true, &data, ts(1)).unwrap();

    let mut discounted = package(10, "us", Some(14.99));
    discounted.discount = Some(25);
    discounted.timestamp = Some(ts(3));
    let merged = apply_package(Some(app), true, &discounted, ts(3)).unwrap();

    let story = &merged.prices["us"].price_story;
    assert_eq!(story.len(), 2);
    assert_eq!(story[0].timestamp, ts(3));
    assert!(merged.invariant_price_stories_well_formed());
  }

  #[test]
  fn null_fields_never_overwrite_existing_values() {
    let data = package(10, "us", Some(19.99));
    let app = apply_package(None, true, &data, ts(1)).unwrap();

    let mut sparse = package(10, "us", None);
    sparse.name = None;
    sparse.developers = None;
    let merged = apply_package(Some(app), true, &sparse, ts(2)).unwrap();

    assert_eq!(merged.name.as_deref(), Some("Half-Life 3"));
    assert_eq!(merged.developers, Some(vec!["Valve".to_string()]));
  }

  /// `spec.md` §8: "Transitioning `is_available: true → false → true` with
  /// the same `(price,discount)` produces exactly one new PricePoint (the
  /// reactivation)." Exercised through the real merge path, not just
  /// `CountryPrice::record_point` directly.
  #[test]
  fn reactivation_through_merge_appends_even_at_the_same_price() {
    let data = package(10, "us", Some(9.99));
    let app = apply_package(None, true, &data, ts(1)).unwrap();
    assert_eq!(app.prices["us"].price_story.len(), 1);

    let outage = package(10, "us", None);
    let app = apply_package(Some(app), false, &outage, ts(2)).unwrap();
    assert!(!app.prices["us"].is_available);
    assert_eq!(app.prices["us"].price_story.len(), 1, "outage alone must not create a point");

    let mut recovered = package(10, "us", Some(9.99));
    recovered.timestamp = Some(ts(3));
    let app = apply_package(Some(app), true, &recovered, ts(3)).unwrap();

    assert!(app.prices["us"].is_available);
    let story = &app.prices["us"].price_story;
    assert_eq!(story.len(), 2, "reactivation at the same price must still append a point");
    assert_eq!(story[0].timestamp, ts(3));
  }
}
