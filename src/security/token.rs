//! Anti-replay tokens.
//!
//! One live token per session: issuing a new token silently invalidates the
//! previous one, so a form left open in another tab stops validating after a
//! refresh. Tokens come from the clock plus a non-cryptographic PRNG; they
//! deter casual replay, not a targeted adversary.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::observability::metrics;
use crate::storage::{KeyValueStore, TOKEN_KEY};

/// Tokens of this length or shorter never validate.
pub const MIN_TOKEN_LEN: usize = 10;

const RANDOM_SUFFIX_LEN: usize = 16;

/// Issues and checks the session's anti-replay token.
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn KeyValueStore>,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Generate a token and make it the session's only live token.
    ///
    /// The token is returned even if it could not be stored; it will simply
    /// fail validation.
    pub fn issue(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let suffix: String = std::iter::repeat_with(fastrand::alphanumeric)
            .take(RANDOM_SUFFIX_LEN)
            .collect();
        let token = format!("{:x}{}", millis, suffix);

        if let Err(e) = self.store.set(TOKEN_KEY, &token) {
            metrics::record_storage_failure("token_issue");
            tracing::error!(error = %e, "Failed to store anti-replay token");
        }
        token
    }

    /// True iff `candidate` is the live token. Fails closed on storage errors.
    pub fn validate(&self, candidate: &str) -> bool {
        if candidate.len() <= MIN_TOKEN_LEN {
            return false;
        }
        match self.store.get(TOKEN_KEY) {
            Ok(Some(stored)) => stored == candidate,
            Ok(None) => false,
            Err(e) => {
                metrics::record_storage_failure("token_validate");
                tracing::warn!(error = %e, "Token store unavailable, rejecting token");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_single_live_token() {
        let issuer = TokenIssuer::new(Arc::new(MemoryStore::new()));

        let first = issuer.issue();
        assert!(issuer.validate(&first));

        let second = issuer.issue();
        assert_ne!(first, second);
        assert!(!issuer.validate(&first));
        assert!(issuer.validate(&second));
    }

    #[test]
    fn test_short_and_missing_tokens_rejected() {
        let store = MemoryStore::new();
        let issuer = TokenIssuer::new(Arc::new(store.clone()));
        assert!(!issuer.validate("anything-long-enough"));

        store.set(TOKEN_KEY, "short").unwrap();
        assert!(!issuer.validate("short"));
        assert!(!issuer.validate(""));
    }

    #[test]
    fn test_fails_closed_when_store_unavailable() {
        let store = MemoryStore::new();
        let issuer = TokenIssuer::new(Arc::new(store.clone()));
        let token = issuer.issue();

        store.disable();
        assert!(!issuer.validate(&token));

        // Issuing still hands out a token without panicking.
        let orphan = issuer.issue();
        assert!(orphan.len() > MIN_TOKEN_LEN);
    }
}
