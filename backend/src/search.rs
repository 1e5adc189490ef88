use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use steam_core::CoreError;

/// `spec.md` §4.8: `fulltext_search(term, fields?) → [app_id]`, delegated
/// to an external Elasticsearch-class index. `ReadPath` only ever
/// consumes the returned id set; the index itself is populated by the
/// external ETL (out of scope here).
#[async_trait]
pub trait SearchFilter: Send + Sync {
  async fn fulltext_search(&self, term: &str, fields: Option<&[String]>) -> Result<Vec<i64>, CoreError>;
}

/// Calls a configured external search service's `GET /search?q=&fields=`
/// endpoint. The wire contract is the one piece of the external index
/// this system owns; everything about how it indexes is out of scope.
pub struct RemoteSearchFilter {
  http: Client,
  base_url: String,
}

impl RemoteSearchFilter {
  pub fn new(http: Client, base_url: impl Into<String>) -> Self {
    Self {
      http,
      base_url: base_url.into(),
    }
  }
}

#[derive(Deserialize)]
struct SearchResponse {
  app_ids: Vec<i64>,
}

#[async_trait]
impl SearchFilter for RemoteSearchFilter {
  async fn fulltext_search(&self, term: &str, fields: Option<&[String]>) -> Result<Vec<i64>, CoreError> {
    let mut request = self.http.get(format!("{}/search", self.base_url)).query(&[("q", term)]);
    if let Some(fields) = fields {
      request = request.query(&[("fields", fields.join(","))]);
    }

    let response = request
      .send()
      .await
      .map_err(|e| CoreError::Internal(format!("search index unreachable: {e}")))?
      .error_for_status()
      .map_err(|e| CoreError::Internal(format!("search index error: {e}")))?
      .json::<SearchResponse>()
      .await
      .map_err(|e| CoreError::Internal(format!("malformed search response: {e}")))?;

    Ok(response.app_ids)
  }
}

/// No search index configured: `search=` is rejected rather than silently
/// matching everything or nothing.
pub struct DisabledSearchFilter;

#[async_trait]
impl SearchFilter for DisabledSearchFilter {
  async fn fulltext_search(&self, _term: &str, _fields: Option<&[String]>) -> Result<Vec<i64>, CoreError> {
    Err(CoreError::Validation("full-text search is not configured".to_string()))
  }
}
