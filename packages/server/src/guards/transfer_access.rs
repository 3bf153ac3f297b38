//! Ownership check for the transfer operation.

use std::sync::Arc;

use async_trait::async_trait;

use campus_core::{ApiError, RequestContext, Role, StudentId};

use crate::dispatch::Guard;
use crate::storage::StudentStore;

/// Allows a transfer when the caller may touch either end of the move.
///
/// Superadmins pass unconditionally. A school admin passes when their
/// school is the student's current school or the transfer destination.
/// On success the fetched student is attached to the context so the
/// validation guard and the operation work from the same record.
pub struct TransferAccessGuard {
    students: Arc<dyn StudentStore>,
}

impl TransferAccessGuard {
    #[must_use]
    pub fn new(students: Arc<dyn StudentStore>) -> Self {
        Self { students }
    }
}

#[async_trait]
impl Guard for TransferAccessGuard {
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        let principal = ctx.require_principal()?.clone();
        let student_id = StudentId::from(ctx.str_field("student_id")?);
        let student = self
            .students
            .get(&student_id)
            .await
            .map_err(|_| ApiError::NotFound("student".to_string()))?;

        if principal.role != Role::Superadmin {
            let admin_school = principal.school_id.ok_or_else(|| {
                ApiError::Forbidden(
                    "you can only transfer students from or to your own school".to_string(),
                )
            })?;
            let to_school = ctx.opt_str_field("to_school_id").unwrap_or_default();
            let owns_source = admin_school == student.school_id;
            let owns_destination = admin_school.as_str() == to_school;
            if !owns_source && !owns_destination {
                return Err(ApiError::Forbidden(
                    "you can only transfer students from or to your own school".to_string(),
                ));
            }
        }

        ctx.student = Some(student);
        Ok(())
    }
}
