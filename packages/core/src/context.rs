//! Per-request context threaded through the guard chain into the operation.
//!
//! Created once per inbound request, owned exclusively by that request, and
//! discarded after the response is sent. Guards may add fields (the
//! authenticated principal, a pre-fetched student) but never remove them.

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::types::{Principal, Student};

/// Mutable request-scoped data bag.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Flat input payload: query parameters and JSON body merged, body wins.
    pub payload: Map<String, Value>,
    /// Bearer credential extracted once at the transport boundary; guards
    /// never re-parse raw headers.
    pub token: Option<String>,
    /// Set by the authentication guard on success.
    pub principal: Option<Principal>,
    /// Set by the transfer access guard so the operation does not re-fetch.
    pub student: Option<Student>,
}

impl RequestContext {
    /// Build the context from body + query + extracted bearer token.
    ///
    /// Merge is deterministic: query fields first, then body fields on top.
    #[must_use]
    pub fn new(body: Map<String, Value>, query: Map<String, Value>, token: Option<String>) -> Self {
        let mut payload = query;
        for (k, v) in body {
            payload.insert(k, v);
        }
        Self {
            payload,
            token,
            principal: None,
            student: None,
        }
    }

    /// Required string field from the payload.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the field is missing, not a string, or empty.
    pub fn str_field(&self, name: &str) -> Result<&str, ApiError> {
        match self.payload.get(name).and_then(Value::as_str) {
            Some(s) if !s.is_empty() => Ok(s),
            _ => Err(ApiError::invalid(format!("{name} is required"))),
        }
    }

    /// Optional string field; absent, null, and empty all read as `None`.
    #[must_use]
    pub fn opt_str_field(&self, name: &str) -> Option<&str> {
        self.payload
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Optional unsigned integer field. Accepts JSON numbers and numeric
    /// strings (query parameters arrive as strings).
    #[must_use]
    pub fn opt_u64_field(&self, name: &str) -> Option<u64> {
        match self.payload.get(name) {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }
    }

    /// The authenticated principal, or `Forbidden` when no guard attached one.
    ///
    /// # Errors
    ///
    /// `Forbidden` if the authentication guard has not run.
    pub fn require_principal(&self) -> Result<&Principal, ApiError> {
        self.principal
            .as_ref()
            .ok_or_else(|| ApiError::Forbidden("user not authenticated".to_string()))
    }
}
