use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Namespaced key/value cache with per-entry TTL, used by both `ReadPath`
/// (detail/list responses) and `TokenValidator` (introspection results).
/// Values are stored pre-serialized with an explicit wall-clock deadline
/// so one cache instance serves callers with different TTLs (the fixed
/// 5-minute token-introspection window vs. `ReadPath`'s configurable
/// detail TTL) without a generic parameter leaking into the cache type.
#[derive(Clone)]
pub struct Cache {
  inner: MokaCache<String, Arc<Vec<u8>>>,
}

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
  expires_at_millis: i64,
  payload: T,
}

impl Cache {
  pub fn new(max_capacity: u64) -> Self {
    Self {
      inner: MokaCache::builder().max_capacity(max_capacity).build(),
    }
  }

  fn namespaced(namespace: &str, key: &str) -> String {
    format!("{namespace}_{key}")
  }

  pub async fn set<T: Serialize>(&self, namespace: &str, key: &str, value: &T, ttl: Duration) {
    let entry = StoredEntry {
      expires_at_millis: now_millis() + ttl.as_millis() as i64,
      payload: value,
    };
    let Ok(bytes) = serde_json::to_vec(&entry) else {
      tracing::warn!(namespace, key, "failed to serialize cache entry");
      return;
    };
    self
      .inner
      .insert(Self::namespaced(namespace, key), Arc::new(bytes))
      .await;
  }

  pub async fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
    let full_key = Self::namespaced(namespace, key);
    let bytes = self.inner.get(&full_key).await?;
    let stored: StoredEntry<T> = serde_json::from_slice(&bytes).ok()?;
    if stored.expires_at_millis <= now_millis() {
      self.inner.invalidate(&full_key).await;
      return None;
    }
    Some(stored.payload)
  }

  pub async fn clear(&self, namespace: &str, key: &str) {
    self.inner.invalidate(&Self::namespaced(namespace, key)).await;
  }
}

fn now_millis() -> i64 {
  chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;

  #[derive(Serialize, Deserialize, PartialEq, Debug)]
  struct Probe {
    value: u32,
  }

  #[tokio::test]
  async fn set_then_get_round_trips() {
    let cache = Cache::new(100);
    cache
      .set("token", "abc", &Probe { value: 42 }, Duration::from_secs(60))
      .await;
    let got: Option<Probe> = cache.get("token", "abc").await;
    assert_eq!(got, Some(Probe { value: 42 }));
  }

  #[tokio::test]
  async fn expired_entry_is_not_returned() {
    let cache = Cache::new(100);
    cache
      .set("token", "abc", &Probe { value: 1 }, Duration::from_millis(1))
      .await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    let got: Option<Probe> = cache.get("token", "abc").await;
    assert_eq!(got, None);
  }

  #[tokio::test]
  async fn clear_removes_entry() {
    let cache = Cache::new(100);
    cache
      .set("app", "10", &Probe { value: 7 }, Duration::from_secs(60))
      .await;
    cache.clear("app", "10").await;
    let got: Option<Probe> = cache.get("app", "10").await;
    assert_eq!(got, None);
  }

  #[tokio::test]
  async fn namespaces_do_not_collide() {
    let cache = Cache::new(100);
    cache
      .set("token", "1", &Probe { value: 1 }, Duration::from_secs(60))
      .await;
    cache
      .set("app", "1", &Probe { value: 2 }, Duration::from_secs(60))
      .await;
    assert_eq!(cache.get::<Probe>("token", "1").await, Some(Probe { value: 1 }));
    assert_eq!(cache.get::<Probe>("app", "1").await, Some(Probe { value: 2 }));
  }
}
