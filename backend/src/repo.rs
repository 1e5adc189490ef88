use chrono::Utc;
use sqlx::{PgPool, Row};
use steam_core::models::App;
use steam_core::CoreError;

use crate::filters::{ListQuery, SortDirection};

/// A document row plus its optimistic-concurrency revision
/// (`spec.md` §4.6, "optimistic replace ... on conflict, re-read and
/// retry"). `App` itself carries no revision field — it is storage
/// metadata, not part of the domain document.
pub struct Versioned {
  pub app: App,
  pub revision: i64,
}

#[derive(Clone)]
pub struct AppRepo {
  pool: PgPool,
}

impl AppRepo {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn get(&self, id: i64) -> Result<Option<Versioned>, CoreError> {
    let row = sqlx::query("SELECT document, revision FROM apps WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;

    let Some(row) = row else { return Ok(None) };
    let document: serde_json::Value = row.try_get("document").map_err(|e| CoreError::Database(e.to_string()))?;
    let revision: i64 = row.try_get("revision").map_err(|e| CoreError::Database(e.to_string()))?;
    let app: App = serde_json::from_value(document).map_err(|e| CoreError::Internal(format!("corrupt app document: {e}")))?;

    Ok(Some(Versioned { app, revision }))
  }

  /// Inserts a brand-new document at revision 1. Fails with
  /// `CoreError::Conflict` if another writer inserted the same id first
  /// (the "no-op, re-read and retry" path in `PackageStore::merge_with_retry`).
  pub async fn insert_new(&self, app: &App) -> Result<(), CoreError> {
    let document = serde_json::to_value(app).map_err(|e| CoreError::Internal(e.to_string()))?;

    let result = sqlx::query(
      "INSERT INTO apps (id, name, document, revision, updated_at) VALUES ($1, $2, $3, 1, $4) ON CONFLICT (id) DO NOTHING",
    )
    .bind(app.id)
    .bind(&app.name)
    .bind(&document)
    .bind(app.updated_at)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return Err(CoreError::Conflict(format!("app {} was inserted concurrently", app.id)));
    }
    Ok(())
  }

  /// Conditional update on `revision`; returns whether the write landed.
  /// A `false` return means someone else mutated the row between our
  /// read and write — the caller re-reads and retries.
  pub async fn replace(&self, app: &App, expected_revision: i64) -> Result<bool, CoreError> {
    let document = serde_json::to_value(app).map_err(|e| CoreError::Internal(e.to_string()))?;

    let result = sqlx::query(
      "UPDATE apps SET name = $1, document = $2, revision = revision + 1, updated_at = $3 WHERE id = $4 AND revision = $5",
    )
    .bind(&app.name)
    .bind(&document)
    .bind(app.updated_at)
    .bind(app.id)
    .bind(expected_revision)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected() > 0)
  }

  pub async fn delete(&self, id: i64) -> Result<bool, CoreError> {
    let result = sqlx::query("DELETE FROM apps WHERE id = $1").bind(id).execute(&self.pool).await?;
    Ok(result.rows_affected() > 0)
  }

  /// `GET /apps`: a paginated, filtered, sorted list of compact rows.
  /// Filtering/sorting SQL is assembled by `filters::ListQuery`; this
  /// method only binds the page window and runs it.
  pub async fn list(&self, query: &ListQuery, page: i64, size: i64) -> Result<Vec<App>, CoreError> {
    let mut builder = sqlx::QueryBuilder::new("SELECT document FROM apps");
    query.push_where(&mut builder);

    builder.push(" ORDER BY ");
    if query.sorts.is_empty() {
      builder.push("id ASC");
    } else {
      for (i, sort) in query.sorts.iter().enumerate() {
        if i > 0 {
          builder.push(", ");
        }
        builder.push(sort.expression(query.main_country()));
        builder.push(match sort.direction {
          SortDirection::Ascending => " ASC",
          SortDirection::Descending => " DESC",
        });
      }
    }

    builder.push(" LIMIT ").push_bind(size).push(" OFFSET ").push_bind(page * size);

    let rows = builder.build().fetch_all(&self.pool).await?;

    rows
      .into_iter()
      .map(|row| {
        let document: serde_json::Value = row.try_get("document").map_err(|e| CoreError::Database(e.to_string()))?;
        serde_json::from_value(document).map_err(|e| CoreError::Internal(format!("corrupt app document: {e}")))
      })
      .collect()
  }

  pub async fn count(&self, query: &ListQuery) -> Result<i64, CoreError> {
    let mut builder = sqlx::QueryBuilder::new("SELECT count(*) FROM apps");
    query.push_where(&mut builder);
    let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
    Ok(count)
  }
}

pub fn now() -> chrono::DateTime<Utc> {
  Utc::now()
}
