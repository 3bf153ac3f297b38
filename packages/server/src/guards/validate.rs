//! Input validation guards.
//!
//! One [`SchemaGuard`] per write operation, each built from a declarative
//! field-rule set; the transfer gets its own guard because its last check
//! is cross-field and needs the student attached by the access guard.

use async_trait::async_trait;

use campus_core::{check_fields, ApiError, FieldRule, RequestContext};

use crate::dispatch::Guard;

/// Checks the merged payload against a fixed rule set, reporting every
/// violation at once.
pub struct SchemaGuard {
    rules: Vec<FieldRule>,
}

impl SchemaGuard {
    #[must_use]
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn login() -> Self {
        Self::new(vec![
            FieldRule::required_email("email"),
            FieldRule::required_str("password"),
        ])
    }

    #[must_use]
    pub fn create_user() -> Self {
        Self::new(vec![
            FieldRule::required_email("email"),
            FieldRule::min_len("password", 8),
            FieldRule::required_str("role"),
            FieldRule::optional_str("school_id"),
        ])
    }

    #[must_use]
    pub fn update_user() -> Self {
        Self::new(vec![FieldRule::optional_email("email")])
    }

    #[must_use]
    pub fn create_school() -> Self {
        Self::new(vec![
            FieldRule::required_str("name"),
            FieldRule::required_str("address"),
            FieldRule::required_email("contact_email"),
            FieldRule::required_str("phone"),
        ])
    }

    #[must_use]
    pub fn update_school() -> Self {
        Self::new(vec![
            FieldRule::optional_str("name"),
            FieldRule::optional_str("address"),
            FieldRule::optional_email("contact_email"),
            FieldRule::optional_str("phone"),
        ])
    }

    #[must_use]
    pub fn create_classroom() -> Self {
        Self::new(vec![
            FieldRule::required_str("name"),
            FieldRule::required_str("code"),
            FieldRule::optional_str("school_id"),
            FieldRule::optional_number("capacity", 1),
        ])
    }

    #[must_use]
    pub fn update_classroom() -> Self {
        Self::new(vec![
            FieldRule::optional_str("name"),
            FieldRule::optional_str("code"),
            FieldRule::optional_number("capacity", 1),
        ])
    }

    #[must_use]
    pub fn create_student() -> Self {
        Self::new(vec![
            FieldRule::required_str("first_name"),
            FieldRule::required_str("last_name"),
            FieldRule::required_email("email"),
            FieldRule::required_str("classroom_id"),
            FieldRule::optional_str("school_id"),
            FieldRule::optional_str("admission_number"),
        ])
    }

    #[must_use]
    pub fn update_student() -> Self {
        Self::new(vec![
            FieldRule::optional_str("first_name"),
            FieldRule::optional_str("last_name"),
            FieldRule::optional_email("email"),
            FieldRule::optional_str("classroom_id"),
        ])
    }
}

#[async_trait]
impl Guard for SchemaGuard {
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        let violations = check_fields(&self.rules, &ctx.payload);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ApiError::InvalidInput { violations })
        }
    }
}

/// Transfer-specific validation.
///
/// Runs after [`TransferAccessGuard`](crate::guards::TransferAccessGuard),
/// so the student under transfer is already on the context and the
/// same-location rejection compares against the student's actual current
/// location rather than trusting the payload.
#[derive(Default)]
pub struct TransferValidationGuard;

impl TransferValidationGuard {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Guard for TransferValidationGuard {
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        let rules = [
            FieldRule::required_str("student_id"),
            FieldRule::required_str("to_school_id"),
            FieldRule::required_str("to_classroom_id"),
            FieldRule::optional_str("reason"),
        ];
        let violations = check_fields(&rules, &ctx.payload);
        if !violations.is_empty() {
            return Err(ApiError::InvalidInput { violations });
        }

        let student = ctx.student.as_ref().ok_or_else(|| {
            ApiError::Internal("transfer validated without access check".to_string())
        })?;
        let to_school = ctx.str_field("to_school_id")?;
        let to_classroom = ctx.str_field("to_classroom_id")?;
        if student.school_id.as_str() == to_school && student.classroom_id.as_str() == to_classroom
        {
            return Err(ApiError::invalid(
                "student is already enrolled in the destination classroom",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use campus_core::{
        now_millis, ClassroomId, SchoolId, Student, StudentId, StudentStatus,
    };

    use super::*;

    fn ctx(payload: Value) -> RequestContext {
        match payload {
            Value::Object(m) => RequestContext::new(m, Map::new(), None),
            _ => unreachable!(),
        }
    }

    fn enrolled_student() -> Student {
        Student {
            id: StudentId::from("st-1"),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            admission_number: "ADM1".to_string(),
            classroom_id: ClassroomId::from("c-a"),
            school_id: SchoolId::from("school-a"),
            enrollment_date: now_millis(),
            status: StudentStatus::Active,
            created_at: now_millis(),
        }
    }

    #[tokio::test]
    async fn login_schema_accepts_credentials_and_collects_all_violations() {
        let guard = SchemaGuard::login();
        let mut ok = ctx(json!({"email": "a@b.co", "password": "pw"}));
        guard.check(&mut ok).await.unwrap();

        let err = guard.check(&mut ctx(json!({}))).await.unwrap_err();
        match err {
            ApiError::InvalidInput { violations } => assert_eq!(violations.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_user_enforces_password_length() {
        let guard = SchemaGuard::create_user();
        let err = guard
            .check(&mut ctx(json!({
                "email": "a@b.co",
                "password": "short",
                "role": "school_admin",
            })))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "password must be at least 8 characters"
        );
    }

    #[tokio::test]
    async fn update_schemas_accept_empty_payloads() {
        let mut empty = ctx(json!({}));
        SchemaGuard::update_user().check(&mut empty).await.unwrap();
        SchemaGuard::update_school().check(&mut empty).await.unwrap();
        SchemaGuard::update_classroom().check(&mut empty).await.unwrap();
        SchemaGuard::update_student().check(&mut empty).await.unwrap();
    }

    #[tokio::test]
    async fn transfer_requires_all_three_references() {
        let guard = TransferValidationGuard::new();
        let err = guard
            .check(&mut ctx(json!({"student_id": "st-1"})))
            .await
            .unwrap_err();
        match err {
            ApiError::InvalidInput { violations } => {
                assert_eq!(violations.len(), 2);
                assert!(violations[0].contains("to_school_id"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transfer_to_the_current_location_is_rejected() {
        let guard = TransferValidationGuard::new();
        let mut context = ctx(json!({
            "student_id": "st-1",
            "to_school_id": "school-a",
            "to_classroom_id": "c-a",
        }));
        context.student = Some(enrolled_student());
        let err = guard.check(&mut context).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "student is already enrolled in the destination classroom"
        );
    }

    #[tokio::test]
    async fn transfer_to_a_new_classroom_in_the_same_school_passes() {
        let guard = TransferValidationGuard::new();
        let mut context = ctx(json!({
            "student_id": "st-1",
            "to_school_id": "school-a",
            "to_classroom_id": "c-b",
        }));
        context.student = Some(enrolled_student());
        guard.check(&mut context).await.unwrap();
    }

    #[tokio::test]
    async fn empty_reason_is_a_violation() {
        let guard = TransferValidationGuard::new();
        let mut context = ctx(json!({
            "student_id": "st-1",
            "to_school_id": "school-b",
            "to_classroom_id": "c-b",
            "reason": "",
        }));
        context.student = Some(enrolled_student());
        let err = guard.check(&mut context).await.unwrap_err();
        assert_eq!(err.to_string(), "reason cannot be empty");
    }
}
