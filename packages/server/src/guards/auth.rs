//! Bearer-token authentication guard.

use std::sync::Arc;

use async_trait::async_trait;

use campus_core::{ApiError, Principal, RequestContext, SchoolId, UserId};

use crate::auth::{RevocationStore, TokenService};
use crate::dispatch::Guard;
use crate::storage::UserStore;

/// Verifies the bearer token and attaches the [`Principal`].
///
/// Rejection messages deliberately reveal nothing beyond the broad cause:
/// a revoked token, a tampered token, and an expired token all read as
/// "invalid token".
pub struct AuthGuard {
    tokens: Arc<TokenService>,
    users: Arc<dyn UserStore>,
    revocations: Arc<RevocationStore>,
}

impl AuthGuard {
    #[must_use]
    pub fn new(
        tokens: Arc<TokenService>,
        users: Arc<dyn UserStore>,
        revocations: Arc<RevocationStore>,
    ) -> Self {
        Self {
            tokens,
            users,
            revocations,
        }
    }
}

#[async_trait]
impl Guard for AuthGuard {
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        let token = ctx
            .token
            .clone()
            .ok_or_else(|| ApiError::Unauthenticated("no token provided".to_string()))?;
        if self.revocations.is_revoked(&token) {
            return Err(ApiError::Unauthenticated("invalid token".to_string()));
        }
        let claims = self.tokens.verify(&token)?;

        // The token may outlive the account; re-check the user every time.
        let user = self
            .users
            .get(&UserId::from(claims.sub.as_str()))
            .await
            .map_err(|_| ApiError::Unauthenticated("invalid or inactive user".to_string()))?;
        if !user.is_active {
            return Err(ApiError::Unauthenticated(
                "invalid or inactive user".to_string(),
            ));
        }

        ctx.principal = Some(Principal {
            id: user.id,
            role: user.role,
            school_id: claims.school_id.map(|s| SchoolId::from(s.as_str())),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use campus_core::{now_millis, Role, User};

    use crate::storage::MemoryUserStore;

    use super::*;

    async fn fixture(active: bool) -> (AuthGuard, String) {
        let tokens = Arc::new(TokenService::new("test-secret", Duration::from_secs(3600)));
        let users = Arc::new(MemoryUserStore::new());
        let revocations = Arc::new(RevocationStore::new());
        let user = users
            .insert(User {
                id: UserId::from("u-1"),
                email: "admin@example.com".to_string(),
                password_hash: String::new(),
                role: Role::SchoolAdmin,
                school_id: Some(SchoolId::from("school-a")),
                is_active: active,
                created_at: now_millis(),
            })
            .await
            .unwrap();
        let token = tokens.issue(&user).unwrap();
        (
            AuthGuard::new(tokens, users, revocations),
            token,
        )
    }

    #[tokio::test]
    async fn missing_token_is_rejected_with_no_token_provided() {
        let (guard, _) = fixture(true).await;
        let mut ctx = RequestContext::default();
        let err = guard.check(&mut ctx).await.unwrap_err();
        assert_eq!(err, ApiError::Unauthenticated("no token provided".into()));
    }

    #[tokio::test]
    async fn valid_token_attaches_the_principal() {
        let (guard, token) = fixture(true).await;
        let mut ctx = RequestContext::default();
        ctx.token = Some(token);
        guard.check(&mut ctx).await.unwrap();
        let principal = ctx.principal.unwrap();
        assert_eq!(principal.id, UserId::from("u-1"));
        assert_eq!(principal.role, Role::SchoolAdmin);
        assert_eq!(principal.school_id, Some(SchoolId::from("school-a")));
    }

    #[tokio::test]
    async fn revoked_token_reads_as_invalid() {
        let (guard, token) = fixture(true).await;
        guard.revocations.revoke(&token, now_millis() + 60_000);
        let mut ctx = RequestContext::default();
        ctx.token = Some(token);
        let err = guard.check(&mut ctx).await.unwrap_err();
        assert_eq!(err, ApiError::Unauthenticated("invalid token".into()));
    }

    #[tokio::test]
    async fn tampered_token_reads_as_invalid() {
        let (guard, token) = fixture(true).await;
        let mut ctx = RequestContext::default();
        ctx.token = Some(format!("{token}x"));
        let err = guard.check(&mut ctx).await.unwrap_err();
        assert_eq!(err, ApiError::Unauthenticated("invalid token".into()));
    }

    #[tokio::test]
    async fn deactivated_user_is_rejected() {
        let (guard, token) = fixture(false).await;
        let mut ctx = RequestContext::default();
        ctx.token = Some(token);
        let err = guard.check(&mut ctx).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Unauthenticated("invalid or inactive user".into())
        );
    }
}
