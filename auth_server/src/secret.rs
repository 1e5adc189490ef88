use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use steam_core::CoreError;

/// Hashes a client secret for storage. The source (`clients.py::register`)
/// hashes with bcrypt; Argon2 is the teacher's own crate for this job
/// (`domains/user/password.rs::hashed_password`), adopted verbatim here.
pub fn hash_secret(secret: &str) -> Result<String, CoreError> {
  let salt = SaltString::generate(OsRng);
  let argon2 = Argon2::default();

  let hash = argon2
    .hash_password(secret.as_bytes(), &salt)
    .map_err(|e| CoreError::Internal(e.to_string()))?
    .to_string();

  Ok(hash)
}

/// Verifies a client secret against its stored hash (`clients.py::check_secret`).
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, CoreError> {
  let argon2 = Argon2::default();
  let parsed_hash = PasswordHash::new(hash).map_err(|e| CoreError::Internal(e.to_string()))?;

  Ok(argon2.verify_password(secret.as_bytes(), &parsed_hash).is_ok())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_and_rejects_wrong_secret() {
    let secret = "client-secret-123";
    let hash = hash_secret(secret).unwrap();

    assert!(verify_secret(secret, &hash).unwrap());
    assert!(!verify_secret("wrong-secret", &hash).unwrap());
  }

  #[test]
  fn same_secret_hashes_differently_each_time() {
    let a = hash_secret("same-secret").unwrap();
    let b = hash_secret("same-secret").unwrap();
    assert_ne!(a, b);
  }
}
