use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Opaque bearer token, `hex`-encoded random bytes — not a JWT. The source
/// (`auth/auth/models/tokens.py`) mints tokens with `secrets.token_hex`;
/// `rand` + `hex` is the idiomatic Rust equivalent.
pub fn generate_opaque_token(byte_length: usize) -> String {
  let mut bytes = vec![0u8; byte_length];
  rand::thread_rng().fill_bytes(&mut bytes);
  hex::encode(bytes)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenRecord {
  pub token: String,
  pub client_pk: i64,
  pub is_active: bool,
  pub expires_at: DateTime<Utc>,
  pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshTokenRecord {
  pub token: String,
  pub client_pk: i64,
  pub is_active: bool,
  pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminTokenRecord {
  pub token: String,
  pub user_id: i64,
  pub is_active: bool,
  pub expires_at: DateTime<Utc>,
}

/// `POST /api/oauth2/token` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
  pub access_token: String,
  pub expires_in: i64,
  pub refresh_token: String,
  pub token_type: String,
}

/// `POST /api/oauth2/token_refresh` response — no new refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshedAccessToken {
  pub access_token: String,
  pub expires_in: i64,
}

/// `POST /api/oauth2/token_info` response, and the shape cached under
/// `token_<opaque>` by `TokenValidator` (`spec.md` §4.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenInfo {
  pub is_active: bool,
  pub client_id: String,
  pub scopes: Vec<String>,
  pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generated_tokens_are_distinct_and_sized() {
    let a = generate_opaque_token(32);
    let b = generate_opaque_token(32);
    assert_ne!(a, b);
    assert_eq!(a.len(), 64); // hex doubles byte length
  }
}
