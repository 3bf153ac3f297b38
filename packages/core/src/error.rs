//! Error taxonomy for every API path.
//!
//! Guards and operations report failures as [`ApiError`] values; the
//! dispatcher is the single place that converts them into response
//! envelopes. Errors are classified by HTTP-equivalent class, not by
//! concrete cause.

use thiserror::Error;

/// Classified API failure.
///
/// Each variant maps to exactly one HTTP status code via [`ApiError::code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Missing, invalid, or revoked credential; unknown or inactive identity.
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated, but the role or ownership boundary forbids the action.
    #[error("{0}")]
    Forbidden(String),

    /// Schema or cross-field validation failure. Carries every violated
    /// constraint; the envelope message joins them.
    #[error("{}", violations.join(", "))]
    InvalidInput { violations: Vec<String> },

    /// A referenced entity, module, or operation does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Uniqueness violation.
    #[error("{0}")]
    Conflict(String),

    /// Unexpected fault. The message is logged server-side and sanitized
    /// before reaching the client.
    #[error("{0}")]
    Internal(String),

    /// A compensating rollback itself failed: state is inconsistent and
    /// requires operator intervention. Logged loudly; the client receives
    /// a 500-class envelope since no safe partial-success response exists.
    #[error("{0}")]
    Inconsistency(String),
}

impl ApiError {
    /// HTTP status code for this error class.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            ApiError::Unauthenticated(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InvalidInput { .. } => 422,
            ApiError::Internal(_) | ApiError::Inconsistency(_) => 500,
        }
    }

    /// Single-violation validation failure.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidInput {
            violations: vec![message.into()],
        }
    }

    /// Whether the client-facing message must be replaced with a generic one.
    #[must_use]
    pub fn is_sanitized(&self) -> bool {
        matches!(self, ApiError::Internal(_) | ApiError::Inconsistency(_))
    }
}
