//! Field-rule validation primitives used by the validation guards.
//!
//! A rule set describes the declared input fields of one operation; checking
//! collects every violation so the guard can report them all at once.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Deliberately permissive: one @, one dot after it, no whitespace.
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|_| unreachable!("static pattern"))
});

/// What shape a field's value must have.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// UTF-8 string with a minimum length.
    Str { min: usize },
    /// String that must look like an email address.
    Email,
    /// Numeric value with a minimum.
    Number { min: i64 },
}

/// Declared constraint for one input field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

impl FieldRule {
    /// Required non-empty string.
    #[must_use]
    pub fn required_str(name: &'static str) -> Self {
        Self {
            name,
            required: true,
            kind: FieldKind::Str { min: 1 },
        }
    }

    /// Optional string; validated only when present.
    #[must_use]
    pub fn optional_str(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            kind: FieldKind::Str { min: 1 },
        }
    }

    /// Required email-shaped string.
    #[must_use]
    pub fn required_email(name: &'static str) -> Self {
        Self {
            name,
            required: true,
            kind: FieldKind::Email,
        }
    }

    /// Optional email-shaped string.
    #[must_use]
    pub fn optional_email(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            kind: FieldKind::Email,
        }
    }

    /// Required string with a minimum length.
    #[must_use]
    pub fn min_len(name: &'static str, min: usize) -> Self {
        Self {
            name,
            required: true,
            kind: FieldKind::Str { min },
        }
    }

    /// Optional number with a minimum value.
    #[must_use]
    pub fn optional_number(name: &'static str, min: i64) -> Self {
        Self {
            name,
            required: false,
            kind: FieldKind::Number { min },
        }
    }
}

/// Check a payload against a rule set, collecting every violation.
///
/// An empty result means the payload is valid.
#[must_use]
pub fn check_fields(rules: &[FieldRule], payload: &Map<String, Value>) -> Vec<String> {
    let mut violations = Vec::new();

    for rule in rules {
        let value = payload.get(rule.name);
        let present = value.is_some_and(|v| !v.is_null());

        if !present {
            if rule.required {
                violations.push(format!("{} is required", rule.name));
            }
            continue;
        }
        let value = value.unwrap_or(&Value::Null);

        match rule.kind {
            FieldKind::Str { min } => match value.as_str() {
                Some(s) if s.len() >= min => {}
                Some(_) if min == 1 => {
                    violations.push(format!("{} cannot be empty", rule.name));
                }
                Some(_) => {
                    violations.push(format!("{} must be at least {min} characters", rule.name));
                }
                None => violations.push(format!("{} must be a string", rule.name)),
            },
            FieldKind::Email => match value.as_str() {
                Some(s) if EMAIL_RE.is_match(s) => {}
                _ => violations.push(format!("{} must be a valid email", rule.name)),
            },
            FieldKind::Number { min } => match value.as_i64() {
                Some(n) if n >= min => {}
                Some(_) => violations.push(format!("{} must be >= {min}", rule.name)),
                None => violations.push(format!("{} must be a number", rule.name)),
            },
        }
    }

    violations
}
