use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::cache::Cache;

/// Plain NATS core pub/sub (not JetStream — invalidation is fire-and-forget
/// and at-most-once is fine, unlike the durable `WorkQueue`) carrying
/// cross-process token invalidation. `spec.md` §4.2 requires that a token
/// mutation at the Auth service clears the Backend's `TokenValidator`
/// cache immediately; since Auth and Backend are separate processes with
/// independent `Cache` instances, this subject is the channel that
/// closes the gap a shared-nothing `moka` cache would otherwise leave
/// open for up to `TOKEN_INFO_CACHE_TTL`.
pub const TOKEN_INVALIDATED_SUBJECT: &str = "auth.token_invalidated";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenInvalidated {
  token: String,
}

/// Publishes on [`TOKEN_INVALIDATED_SUBJECT`]. Called by the Auth service
/// whenever `ClientRepo::issue_access_token` evicts an older token
/// (`spec.md` §9 LRU redesign). Best-effort: a publish failure is logged
/// by the caller, not propagated, since the token is already deactivated
/// in Postgres regardless of whether any validator cache hears about it.
pub async fn publish_token_invalidated(nats: &async_nats::Client, token: &str) -> Result<(), async_nats::PublishError> {
  let payload = serde_json::to_vec(&TokenInvalidated { token: token.to_string() }).expect("TokenInvalidated always serializes");
  nats.publish(TOKEN_INVALIDATED_SUBJECT, payload.into()).await
}

/// Subscribes to [`TOKEN_INVALIDATED_SUBJECT`] and clears the matching
/// `token_<value>` cache entry as each message arrives. Runs until the
/// subscription's underlying connection closes; callers spawn this as a
/// background task at startup (the Backend and Auth server's own
/// `TokenValidator`, if it ever reads its own cache, both want this).
pub async fn run_invalidation_listener(nats: async_nats::Client, cache: Cache) {
  let mut subscriber = match nats.subscribe(TOKEN_INVALIDATED_SUBJECT).await {
    Ok(sub) => sub,
    Err(e) => {
      tracing::error!(error = %e, "failed to subscribe to token invalidation subject");
      return;
    }
  };

  while let Some(message) = subscriber.next().await {
    match serde_json::from_slice::<TokenInvalidated>(&message.payload) {
      Ok(invalidated) => cache.clear("token", &invalidated.token).await,
      Err(e) => tracing::warn!(error = %e, "malformed token invalidation message, ignoring"),
    }
  }
}
