use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Primary document: one per upstream app_id. Stored by the Backend as a
/// single JSONB row (see `SPEC_FULL.md` §3) keyed on `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct App {
  pub id: i64,
  pub name: Option<String>,
  #[serde(rename = "type")]
  pub kind: Option<String>,
  pub short_description: Option<String>,
  pub is_free: Option<bool>,
  pub developers: Option<Vec<String>>,
  pub publishers: Option<Vec<String>>,
  pub total_recommendations: Option<u64>,
  pub updated_at: DateTime<Utc>,
  pub prices: HashMap<String, CountryPrice>,
}

impl App {
  /// A brand-new document seeded from a single successful observation,
  /// per PackageMerger rule 4 (`spec.md` §4.6).
  pub fn new(id: i64, now: DateTime<Utc>) -> Self {
    Self {
      id,
      name: None,
      kind: None,
      short_description: None,
      is_free: None,
      developers: None,
      publishers: None,
      total_recommendations: None,
      updated_at: now,
      prices: HashMap::new(),
    }
  }

  /// Every PricePoint timestamp across every country must be ≤ `updated_at`.
  pub fn invariant_updated_at_is_watermark(&self) -> bool {
    self
      .prices
      .values()
      .flat_map(|p| p.price_story.iter())
      .all(|point| point.timestamp <= self.updated_at)
  }

  /// Each country's story is strictly newest-first with no adjacent
  /// `(price, discount)` duplicate, per `spec.md` §3/§8.
  pub fn invariant_price_stories_well_formed(&self) -> bool {
    self.prices.values().all(CountryPrice::is_well_formed)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountryPrice {
  #[serde(default = "default_true")]
  pub is_available: bool,
  pub currency: Option<String>,
  /// Index 0 = latest observation.
  pub price_story: Vec<PricePoint>,
}

fn default_true() -> bool {
  true
}

impl Default for CountryPrice {
  fn default() -> Self {
    Self {
      is_available: true,
      currency: None,
      price_story: Vec::new(),
    }
  }
}

impl CountryPrice {
  pub fn latest(&self) -> Option<&PricePoint> {
    self.price_story.first()
  }

  fn is_well_formed(&self) -> bool {
    self.price_story.windows(2).all(|w| w[0].timestamp >= w[1].timestamp)
      && self
        .price_story
        .windows(2)
        .all(|w| (w[0].price, w[0].discount) != (w[1].price, w[1].discount))
  }

  /// Compression invariant from `spec.md` §4.6: append iff `(price,
  /// discount)` differs from the current latest point, then re-sort
  /// descending by timestamp. Returns whether a point was appended.
  ///
  /// `reactivated` forces an append regardless of `(price, discount)`
  /// equality: going `is_available: true → false → true` must always
  /// produce exactly one new PricePoint for the reactivation itself
  /// (`spec.md` §8), even when the price observed on return matches the
  /// one in effect before the outage.
  pub fn record_point(&mut self, point: PricePoint, reactivated: bool) -> bool {
    let should_append = match self.latest() {
      None => true,
      Some(latest) => reactivated || (latest.price, latest.discount) != (point.price, point.discount),
    };

    if should_append {
      self.price_story.push(point);
      self.price_story.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }

    should_append
  }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
  pub timestamp: DateTime<Utc>,
  /// 2-decimal rounded, non-negative.
  pub price: f64,
  /// 0-99 inclusive.
  pub discount: u8,
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap()
  }

  #[test]
  fn record_point_appends_on_first_observation() {
    let mut cp = CountryPrice::default();
    let appended = cp.record_point(
      PricePoint {
        timestamp: ts(1),
        price: 19.99,
        discount: 0,
      },
      false,
    );
    assert!(appended);
    assert_eq!(cp.price_story.len(), 1);
  }

  #[test]
  fn record_point_compresses_unchanged_price() {
    let mut cp = CountryPrice::default();
    cp.record_point(
      PricePoint {
        timestamp: ts(1),
        price: 19.99,
        discount: 0,
      },
      false,
    );
    let appended = cp.record_point(
      PricePoint {
        timestamp: ts(2),
        price: 19.99,
        discount: 0,
      },
      false,
    );
    assert!(!appended);
    assert_eq!(cp.price_story.len(), 1);
  }

  #[test]
  fn record_point_appends_on_price_change_and_sorts_descending() {
    let mut cp = CountryPrice::default();
    cp.record_point(
      PricePoint {
        timestamp: ts(1),
        price: 19.99,
        discount: 0,
      },
      false,
    );
    cp.record_point(
      PricePoint {
        timestamp: ts(3),
        price: 14.99,
        discount: 25,
      },
      false,
    );
    assert_eq!(cp.price_story.len(), 2);
    assert_eq!(cp.price_story[0].timestamp, ts(3));
    assert_eq!(cp.price_story[1].timestamp, ts(1));
    assert!(cp.is_well_formed());
  }

  #[test]
  fn reactivation_with_same_price_forces_a_new_point() {
    let mut cp = CountryPrice::default();
    cp.record_point(
      PricePoint {
        timestamp: ts(1),
        price: 9.99,
        discount: 0,
      },
      false,
    );
    cp.is_available = false;
    cp.is_available = true;
    let appended = cp.record_point(
      PricePoint {
        timestamp: ts(2),
        price: 9.99,
        discount: 0,
      },
      true,
    );
    assert!(appended, "reactivation must always produce a new point, even at the same price");
    assert_eq!(cp.price_story.len(), 2);
  }

  #[test]
  fn non_reactivated_same_price_still_compresses() {
    let mut cp = CountryPrice::default();
    cp.record_point(
      PricePoint {
        timestamp: ts(1),
        price: 9.99,
        discount: 0,
      },
      false,
    );
    let appended = cp.record_point(
      PricePoint {
        timestamp: ts(2),
        price: 9.99,
        discount: 0,
      },
      false,
    );
    assert!(!appended, "an ordinary unchanged observation must still compress");
  }
}
