use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of the Orchestrator's `apps(id, last_updated)` table (`spec.md`
/// §3/§4.9). `last_updated == epoch(0)` means never successfully fetched;
/// `stalest_n` relies on ordering by this column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AppRegistryRow {
  pub id: i64,
  pub last_updated: DateTime<Utc>,
}

pub fn epoch_zero() -> DateTime<Utc> {
  DateTime::from_timestamp(0, 0).expect("epoch zero is a valid timestamp")
}
