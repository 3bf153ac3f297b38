//! Token revocation store.
//!
//! Logout blacklists the presented token until its natural expiry; the
//! authentication guard consults this store on every request, so a revoked
//! but otherwise valid token fails exactly like an invalid one. Written on
//! logout, read on every authenticated request; `DashMap` gives safe
//! concurrent read/write without a global lock.

use dashmap::DashMap;

use campus_core::now_millis;

/// Shared, thread-safe set of revoked tokens with per-entry expiry.
///
/// Constructed at startup and injected into the authentication guard;
/// entries self-bound at the token's own expiry so the set cannot grow past
/// the number of live tokens.
#[derive(Debug, Default)]
pub struct RevocationStore {
    /// token -> expiry in unix millis.
    revoked: DashMap<String, i64>,
}

impl RevocationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke a token until `expires_at_millis`.
    pub fn revoke(&self, token: &str, expires_at_millis: i64) {
        self.revoked.insert(token.to_string(), expires_at_millis);
    }

    /// Whether the token is currently revoked. Expired entries read as
    /// not-revoked (the token itself is already unverifiable by then).
    #[must_use]
    pub fn is_revoked(&self, token: &str) -> bool {
        self.revoked
            .get(token)
            .is_some_and(|entry| *entry.value() > now_millis())
    }

    /// Drop entries whose expiry has passed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = now_millis();
        // Count inside retain; comparing len() before and after races with
        // concurrent revokes.
        let mut removed = 0;
        self.revoked.retain(|_, expiry| {
            if *expiry > now {
                true
            } else {
                removed += 1;
                false
            }
        });
        removed
    }

    /// Number of tracked revocations, including not-yet-purged expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}
