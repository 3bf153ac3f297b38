//! Signed bearer tokens (HS256).

use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use campus_core::{now_millis, ApiError, Role, User};

/// Claims embedded in every issued token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: Role,
    pub school_id: Option<String>,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
    /// Issued-at, seconds since the epoch.
    pub iat: u64,
}

impl Claims {
    /// Expiry as unix milliseconds, for the revocation store.
    #[must_use]
    pub fn exp_millis(&self) -> i64 {
        i64::try_from(self.exp.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

/// Issues and verifies bearer tokens with a single HMAC secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issue a token for an authenticated user.
    ///
    /// # Errors
    ///
    /// `Internal` if signing fails (malformed key material).
    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now_secs = u64::try_from(now_millis() / 1000).unwrap_or(0);
        let claims = Claims {
            sub: user.id.0.clone(),
            role: user.role,
            school_id: user.school_id.as_ref().map(|s| s.0.clone()),
            exp: now_secs + self.ttl.as_secs(),
            iat: now_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for any invalid, tampered, or expired token. The
    /// client-facing message never distinguishes the cause.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| ApiError::Unauthenticated("invalid token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use campus_core::UserId;

    use super::*;

    fn test_user() -> User {
        User {
            id: UserId::from("u-1"),
            email: "admin@example.com".to_string(),
            password_hash: String::new(),
            role: Role::SchoolAdmin,
            school_id: Some(campus_core::SchoolId::from("school-a")),
            is_active: true,
            created_at: now_millis(),
        }
    }

    #[test]
    fn issue_then_verify_round_trips_claims() {
        let svc = TokenService::new("secret", Duration::from_secs(3600));
        let token = svc.issue(&test_user()).unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.role, Role::SchoolAdmin);
        assert_eq!(claims.school_id.as_deref(), Some("school-a"));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let issuer = TokenService::new("secret-a", Duration::from_secs(3600));
        let verifier = TokenService::new("secret-b", Duration::from_secs(3600));
        let token = issuer.issue(&test_user()).unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(ApiError::Unauthenticated(_))
        ));
    }

    #[test]
    fn garbage_token_fails_verification() {
        let svc = TokenService::new("secret", Duration::from_secs(3600));
        assert!(svc.verify("not.a.token").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = TokenService::new("secret", Duration::from_secs(0));
        let token = svc.issue(&test_user()).unwrap();
        // exp == iat and leeway is zero, so the token is already stale.
        std::thread::sleep(Duration::from_millis(1100));
        assert!(matches!(
            svc.verify(&token),
            Err(ApiError::Unauthenticated(_))
        ));
    }

    #[test]
    fn exp_millis_scales_seconds() {
        let claims = Claims {
            sub: "u".into(),
            role: Role::Superadmin,
            school_id: None,
            exp: 1_700_000_000,
            iat: 0,
        };
        assert_eq!(claims.exp_millis(), 1_700_000_000_000);
    }
}
