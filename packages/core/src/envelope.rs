//! The uniform response envelope.
//!
//! Every path — success, guard failure, handler failure, unexpected fault —
//! normalizes into this one shape before reaching the transport boundary.
//! `code` always drives the HTTP status; `data` is omitted when absent and
//! `errors` appears only for multi-violation validation failures.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Wire shape of every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl Envelope {
    /// Plain 200 success with a message and no payload.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: 200,
            message: message.into(),
            data: None,
            errors: None,
        }
    }

    /// 200 success carrying a payload.
    #[must_use]
    pub fn ok_with(message: impl Into<String>, data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::ok(message)
        }
    }

    /// 201 success for freshly created entities.
    #[must_use]
    pub fn created(message: impl Into<String>, data: Value) -> Self {
        Self {
            code: 201,
            ..Self::ok_with(message, data)
        }
    }

    /// Failure with an explicit status code.
    #[must_use]
    pub fn fail(code: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            message: message.into(),
            data: None,
            errors: None,
        }
    }
}

impl From<ApiError> for Envelope {
    fn from(err: ApiError) -> Self {
        let code = err.code();
        let message = if err.is_sanitized() {
            "internal server error".to_string()
        } else {
            err.to_string()
        };
        let errors = match err {
            ApiError::InvalidInput { violations } if violations.len() > 1 => Some(violations),
            _ => None,
        };
        Self {
            success: false,
            code,
            message,
            data: None,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn ok_omits_data_and_errors_on_the_wire() {
        let json = serde_json::to_value(Envelope::ok("done")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["code"], 200);
        assert!(json.get("data").is_none());
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn created_carries_payload_and_201() {
        let env = Envelope::created("school created", json!({"id": "s1"}));
        assert!(env.success);
        assert_eq!(env.code, 201);
        assert_eq!(env.data.unwrap()["id"], "s1");
    }

    #[test]
    fn single_violation_has_no_errors_list() {
        let env = Envelope::from(ApiError::invalid("email is required"));
        assert_eq!(env.code, 422);
        assert_eq!(env.message, "email is required");
        assert!(env.errors.is_none());
    }

    #[test]
    fn multiple_violations_populate_errors_list() {
        let env = Envelope::from(ApiError::InvalidInput {
            violations: vec!["a is required".into(), "b must be a string".into()],
        });
        assert_eq!(env.code, 422);
        assert_eq!(env.errors.as_deref().unwrap().len(), 2);
        assert_eq!(env.message, "a is required, b must be a string");
    }

    #[test]
    fn internal_errors_are_sanitized() {
        let env = Envelope::from(ApiError::Internal("db password leaked".into()));
        assert_eq!(env.code, 500);
        assert_eq!(env.message, "internal server error");
    }

    #[test]
    fn inconsistency_reaches_client_as_plain_500() {
        let env = Envelope::from(ApiError::Inconsistency("rollback failed for x".into()));
        assert_eq!(env.code, 500);
        assert_eq!(env.message, "internal server error");
        assert!(!env.success);
    }
}
