use sqlx::PgPool;
use steam_core::models::{epoch_zero, AppRegistryRow};

/// The orchestrator's relational bookkeeping table: one row per known
/// Steam app id, tracking when its data was last actualized
/// (`orchestrator/db/models.py::App` in the source this was distilled
/// from). This is a separate logical database from the Backend's
/// document store — the orchestrator only ever needs the id and a
/// staleness timestamp, never the catalog payload itself.
pub struct AppRegistry {
  pool: PgPool,
}

impl AppRegistry {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  /// Inserts ids not already present, seeded at the Unix epoch so they
  /// sort first for the next staleness-ordered batch. Chunked at 1000 to
  /// stay under Postgres' bind-parameter limit, mirroring the source's
  /// `batch_slicer` chunking before each `INSERT`.
  pub async fn insert_missing(&self, app_ids: &[i64]) -> Result<usize, sqlx::Error> {
    let existing: Vec<i64> = sqlx::query_scalar("SELECT id FROM apps WHERE id = ANY($1)")
      .bind(app_ids)
      .fetch_all(&self.pool)
      .await?;

    let existing: std::collections::HashSet<i64> = existing.into_iter().collect();
    let new_ids: Vec<i64> = app_ids.iter().copied().filter(|id| !existing.contains(id)).collect();

    let epoch = epoch_zero();
    for chunk in new_ids.chunks(1000) {
      let mut query_builder = sqlx::QueryBuilder::new("INSERT INTO apps (id, last_updated) ");
      query_builder.push_values(chunk, |mut b, id| {
        b.push_bind(id).push_bind(epoch);
      });
      query_builder.build().execute(&self.pool).await?;
    }

    Ok(new_ids.len())
  }

  /// Returns the `n` apps with the oldest `last_updated`, the
  /// stalest-first scheduling policy `bulk_request_for_most_outdated_apps_data`
  /// implements via `ORDER BY last_updated LIMIT batch_size`.
  pub async fn stalest_n(&self, n: i64) -> Result<Vec<AppRegistryRow>, sqlx::Error> {
    sqlx::query_as!(
      AppRegistryRow,
      r#"SELECT id, last_updated FROM apps ORDER BY last_updated ASC LIMIT $1"#,
      n
    )
    .fetch_all(&self.pool)
    .await
  }

  /// Advances `last_updated` to now for the given ids, chunked the same
  /// way as `insert_missing`. Called when `update_apps_status` arrives
  /// from the Worker after a successful bulk fetch.
  pub async fn advance(&self, app_ids: &[i64]) -> Result<(), sqlx::Error> {
    for chunk in app_ids.chunks(1000) {
      sqlx::query("UPDATE apps SET last_updated = now() WHERE id = ANY($1)")
        .bind(chunk)
        .execute(&self.pool)
        .await?;
    }
    Ok(())
  }
}
