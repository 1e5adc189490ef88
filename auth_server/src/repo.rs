use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use steam_core::models::token::generate_opaque_token;
use steam_core::CoreError;

use crate::models::Client;

/// Postgres-backed client/token store, grounded in
/// `auth/auth/models/{clients,permissions,tokens}.py`. Each method maps
/// to one of that module's classmethods; the ORM's lazy relationship
/// traversal becomes explicit joins.
pub struct ClientRepo {
  pool: PgPool,
}

pub struct IssuedAccessToken {
  pub token: String,
  pub expires_at: DateTime<Utc>,
  pub scopes: Vec<String>,
  /// Set when issuing this token evicted an older one for the same
  /// client (`spec.md` §9 LRU redesign). The caller publishes this on
  /// `auth.token_invalidated` so remote `TokenValidator` caches drop it
  /// immediately instead of serving it for up to the rest of its TTL.
  pub evicted_token: Option<String>,
}

pub struct TokenIntrospection {
  pub is_active: bool,
  pub client_id: String,
  pub scopes: Vec<String>,
  pub expires_at: DateTime<Utc>,
}

impl ClientRepo {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn find_by_client_id(&self, client_id: &str) -> Result<Option<Client>, CoreError> {
    let client = sqlx::query_as::<_, Client>("SELECT pk, id, secret, name, description FROM clients WHERE id = $1")
      .bind(client_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(client)
  }

  /// `Client.get_all_scopes`: the union of the client's personal scopes
  /// and every scope granted transitively through its roles.
  pub async fn all_scopes(&self, client_pk: i64) -> Result<Vec<String>, CoreError> {
    let rows: Vec<(String,)> = sqlx::query_as(
      r#"
      SELECT DISTINCT s.name FROM scopes s
      JOIN client_scope cs ON cs.scope_id = s.id
      WHERE cs.client_pk = $1
      UNION
      SELECT DISTINCT s.name FROM scopes s
      JOIN scope_role sr ON sr.scope_id = s.id
      JOIN client_role cr ON cr.role_id = sr.role_id
      WHERE cr.client_pk = $1
      "#,
    )
    .bind(client_pk)
    .fetch_all(&self.pool)
    .await?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
  }

  /// Narrows a client's allowed scopes down to whatever subset was
  /// requested at login, or returns every allowed scope if none was
  /// requested (`spec.md` §6 `token {..., scopes?}`).
  pub async fn resolve_requested_scopes(&self, client_pk: i64, requested: &[String]) -> Result<Vec<String>, CoreError> {
    let allowed = self.all_scopes(client_pk).await?;
    if requested.is_empty() {
      return Ok(allowed);
    }
    Ok(requested.iter().filter(|s| allowed.contains(s)).cloned().collect())
  }

  /// `AccessToken.create_token`, redesigned per `spec.md` §9: once the
  /// client is at `max_per_client` active tokens, evict the single
  /// oldest one (LRU) instead of deactivating every active token.
  pub async fn issue_access_token(
    &self,
    client_pk: i64,
    scopes: &[String],
    ttl: ChronoDuration,
    byte_length: usize,
    max_per_client: i64,
  ) -> Result<IssuedAccessToken, CoreError> {
    let mut tx = self.pool.begin().await?;

    let active_count: i64 = sqlx::query_scalar("SELECT count(*) FROM access_tokens WHERE client_pk = $1 AND is_active")
      .bind(client_pk)
      .fetch_one(&mut *tx)
      .await?;

    let evicted_token: Option<String> = if active_count >= max_per_client {
      sqlx::query_scalar(
        r#"
        UPDATE access_tokens SET is_active = false WHERE token = (
          SELECT token FROM access_tokens WHERE client_pk = $1 AND is_active
          ORDER BY issued_at ASC LIMIT 1
        )
        RETURNING token
        "#,
      )
      .bind(client_pk)
      .fetch_optional(&mut *tx)
      .await?
    } else {
      None
    };

    let token = generate_opaque_token(byte_length);
    let expires_at = Utc::now() + ttl;

    sqlx::query("INSERT INTO access_tokens (token, client_pk, is_active, expires_at) VALUES ($1, $2, true, $3)")
      .bind(&token)
      .bind(client_pk)
      .bind(expires_at)
      .execute(&mut *tx)
      .await?;

    for scope_name in scopes {
      sqlx::query(
        r#"
        INSERT INTO token_scope (token, scope_id)
        SELECT $1, id FROM scopes WHERE name = $2
        "#,
      )
      .bind(&token)
      .bind(scope_name)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;

    Ok(IssuedAccessToken {
      token,
      expires_at,
      scopes: scopes.to_vec(),
      evicted_token,
    })
  }

  pub async fn issue_refresh_token(&self, client_pk: i64, ttl: ChronoDuration, byte_length: usize) -> Result<String, CoreError> {
    let token = generate_opaque_token(byte_length);
    let expires_at = Utc::now() + ttl;

    sqlx::query("INSERT INTO refresh_tokens (token, client_pk, is_active, expires_at) VALUES ($1, $2, true, $3)")
      .bind(&token)
      .bind(client_pk)
      .bind(expires_at)
      .execute(&self.pool)
      .await?;

    Ok(token)
  }

  /// Returns the owning client's pk if the refresh token is active and
  /// unexpired (`RefreshToken.get_or_create_token`'s validity check).
  pub async fn active_refresh_token_owner(&self, refresh_token: &str) -> Result<Option<i64>, CoreError> {
    let client_pk: Option<i64> = sqlx::query_scalar(
      "SELECT client_pk FROM refresh_tokens WHERE token = $1 AND is_active AND expires_at > now()",
    )
    .bind(refresh_token)
    .fetch_optional(&self.pool)
    .await?;
    Ok(client_pk)
  }

  /// `/token_info`: active status, owning client id, and granted scopes
  /// for an opaque access token.
  pub async fn introspect(&self, access_token: &str) -> Result<Option<TokenIntrospection>, CoreError> {
    let row: Option<(bool, DateTime<Utc>, String)> = sqlx::query_as(
      r#"
      SELECT at.is_active, at.expires_at, c.id
      FROM access_tokens at
      JOIN clients c ON c.pk = at.client_pk
      WHERE at.token = $1
      "#,
    )
    .bind(access_token)
    .fetch_optional(&self.pool)
    .await?;

    let Some((is_active, expires_at, client_id)) = row else {
      return Ok(None);
    };

    let scopes: Vec<(String,)> = sqlx::query_as(
      "SELECT s.name FROM scopes s JOIN token_scope ts ON ts.scope_id = s.id WHERE ts.token = $1",
    )
    .bind(access_token)
    .fetch_all(&self.pool)
    .await?;

    Ok(Some(TokenIntrospection {
      is_active: is_active && expires_at > Utc::now(),
      client_id,
      scopes: scopes.into_iter().map(|(name,)| name).collect(),
      expires_at,
    }))
  }
}
