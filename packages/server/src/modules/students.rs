//! Student management, the transfer saga, and movement history.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use tracing::{error, warn};

use campus_core::{
    now_millis, ApiError, ClassroomId, Envelope, GuardName, HttpVerb, ModuleContract,
    OperationSpec, Principal, RequestContext, Role, SchoolId, Student, StudentId, StudentStatus,
    TransferId, TransferRecord, TransferStatus,
};

use crate::dispatch::ApiModule;
use crate::storage::{ClassroomStore, Page, SchoolStore, StudentStore, TransferStore};

pub struct StudentsModule {
    students: Arc<dyn StudentStore>,
    schools: Arc<dyn SchoolStore>,
    classrooms: Arc<dyn ClassroomStore>,
    transfers: Arc<dyn TransferStore>,
}

impl StudentsModule {
    #[must_use]
    pub fn new(
        students: Arc<dyn StudentStore>,
        schools: Arc<dyn SchoolStore>,
        classrooms: Arc<dyn ClassroomStore>,
        transfers: Arc<dyn TransferStore>,
    ) -> Self {
        Self {
            students,
            schools,
            classrooms,
            transfers,
        }
    }

    fn target_school(principal: &Principal, ctx: &RequestContext) -> Result<SchoolId, ApiError> {
        match (&principal.role, &principal.school_id) {
            (Role::SchoolAdmin, Some(school)) => Ok(school.clone()),
            (Role::SchoolAdmin, None) => Err(ApiError::Forbidden("access denied".to_string())),
            (Role::Superadmin, _) => Ok(SchoolId::from(ctx.str_field("school_id")?)),
        }
    }

    fn assert_in_scope(principal: &Principal, school_id: &SchoolId) -> Result<(), ApiError> {
        match principal.role {
            Role::Superadmin => Ok(()),
            Role::SchoolAdmin if principal.school_id.as_ref() == Some(school_id) => Ok(()),
            Role::SchoolAdmin => Err(ApiError::Forbidden("access denied".to_string())),
        }
    }

    fn generate_admission_number() -> String {
        let suffix: u32 = rand::rng().random_range(0..1000);
        format!("ADM{}{suffix:03}", now_millis())
    }

    async fn create(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?;
        let school_id = Self::target_school(principal, ctx)?;
        self.schools
            .get(&school_id)
            .await
            .map_err(|_| ApiError::NotFound("school".to_string()))?;

        let classroom_id = ClassroomId::from(ctx.str_field("classroom_id")?);
        let classroom = self
            .classrooms
            .get(&classroom_id)
            .await
            .map_err(|_| ApiError::NotFound("classroom".to_string()))?;
        if classroom.school_id != school_id {
            return Err(ApiError::invalid(
                "classroom does not belong to the school",
            ));
        }

        let admission_number = ctx
            .opt_str_field("admission_number")
            .map_or_else(Self::generate_admission_number, str::to_string);
        let student = self
            .students
            .insert(Student {
                id: StudentId::generate(),
                first_name: ctx.str_field("first_name")?.to_string(),
                last_name: ctx.str_field("last_name")?.to_string(),
                email: ctx.str_field("email")?.to_string(),
                admission_number,
                classroom_id,
                school_id,
                enrollment_date: now_millis(),
                status: StudentStatus::Active,
                created_at: now_millis(),
            })
            .await?;
        Ok(Envelope::created(
            "student created",
            serde_json::to_value(&student).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }

    async fn list(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?;
        let school_filter = match (&principal.role, &principal.school_id) {
            (Role::SchoolAdmin, Some(school)) => Some(school.clone()),
            (Role::SchoolAdmin, None) => {
                return Err(ApiError::Forbidden("access denied".to_string()))
            }
            (Role::Superadmin, _) => ctx.opt_str_field("school_id").map(SchoolId::from),
        };
        let classroom_filter = ctx.opt_str_field("classroom_id").map(ClassroomId::from);
        let page = Page::clamped(ctx.opt_u64_field("page"), ctx.opt_u64_field("limit"));
        let students = self
            .students
            .list(school_filter.as_ref(), classroom_filter.as_ref(), page)
            .await?;
        Ok(Envelope::ok_with(
            "students listed",
            serde_json::to_value(&students).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }

    async fn get(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?;
        let id = StudentId::from(ctx.str_field("id")?);
        let student = self.students.get(&id).await?;
        Self::assert_in_scope(principal, &student.school_id)?;
        Ok(Envelope::ok_with(
            "student found",
            serde_json::to_value(&student).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }

    async fn update(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?;
        let id = StudentId::from(ctx.str_field("id")?);
        let mut student = self.students.get(&id).await?;
        Self::assert_in_scope(principal, &student.school_id)?;

        if let Some(first_name) = ctx.opt_str_field("first_name") {
            student.first_name = first_name.to_string();
        }
        if let Some(last_name) = ctx.opt_str_field("last_name") {
            student.last_name = last_name.to_string();
        }
        if let Some(email) = ctx.opt_str_field("email") {
            student.email = email.to_string();
        }
        if let Some(classroom_id) = ctx.opt_str_field("classroom_id") {
            // Reassignment stays inside the student's current school; moving
            // schools is what the transfer operation is for.
            let classroom = self
                .classrooms
                .get(&ClassroomId::from(classroom_id))
                .await
                .map_err(|_| ApiError::NotFound("classroom".to_string()))?;
            if classroom.school_id != student.school_id {
                return Err(ApiError::invalid(
                    "classroom does not belong to the school",
                ));
            }
            student.classroom_id = classroom.id;
        }

        let student = self.students.update(student).await?;
        Ok(Envelope::ok_with(
            "student updated",
            serde_json::to_value(&student).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }

    async fn remove(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?;
        let id = StudentId::from(ctx.str_field("id")?);
        let student = self.students.get(&id).await?;
        Self::assert_in_scope(principal, &student.school_id)?;
        self.students.remove(&id).await?;
        Ok(Envelope::ok("student removed"))
    }

    /// The transfer saga: move the student, then append the history record,
    /// rolling the move back if the append fails.
    async fn transfer(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?.clone();
        let snapshot = ctx
            .student
            .clone()
            .ok_or_else(|| ApiError::Internal("transfer ran without access check".to_string()))?;
        let to_school_id = SchoolId::from(ctx.str_field("to_school_id")?);
        let to_classroom_id = ClassroomId::from(ctx.str_field("to_classroom_id")?);
        let reason = ctx.opt_str_field("reason").map(str::to_string);

        self.schools
            .get(&to_school_id)
            .await
            .map_err(|_| ApiError::NotFound("destination school".to_string()))?;
        let destination = self
            .classrooms
            .get(&to_classroom_id)
            .await
            .map_err(|_| ApiError::NotFound("destination classroom".to_string()))?;
        if destination.school_id != to_school_id {
            return Err(ApiError::invalid(
                "destination classroom does not belong to the destination school",
            ));
        }

        let mut moved = snapshot.clone();
        moved.school_id = to_school_id.clone();
        moved.classroom_id = to_classroom_id.clone();
        moved.status = StudentStatus::Transferred;
        let moved = self.students.update(moved).await?;

        let record = TransferRecord {
            id: TransferId::generate(),
            student_id: snapshot.id.clone(),
            from_school_id: snapshot.school_id.clone(),
            from_classroom_id: snapshot.classroom_id.clone(),
            to_school_id,
            to_classroom_id,
            transferred_by: principal.id,
            reason,
            status: TransferStatus::Completed,
            transferred_at: now_millis(),
        };
        match self.transfers.append(record).await {
            Ok(record) => Ok(Envelope::ok_with(
                "student transferred",
                json!({"student": moved, "transfer": record}),
            )),
            Err(append_err) => {
                warn!(
                    student = %snapshot.id,
                    error = %append_err,
                    "history append failed, rolling the move back"
                );
                match self.students.update(snapshot.clone()).await {
                    Ok(_) => Err(ApiError::from(append_err)),
                    Err(rollback_err) => {
                        error!(
                            student = %snapshot.id,
                            append_error = %append_err,
                            rollback_error = %rollback_err,
                            "CRITICAL: transfer rollback failed, student state is inconsistent"
                        );
                        Err(ApiError::Inconsistency(format!(
                            "transfer rollback failed for student {}: {rollback_err}",
                            snapshot.id
                        )))
                    }
                }
            }
        }
    }

    async fn history(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?;
        let id = StudentId::from(ctx.str_field("student_id")?);
        let student = self.students.get(&id).await?;
        Self::assert_in_scope(principal, &student.school_id)?;
        let records = self.transfers.list_for_student(&id).await?;
        Ok(Envelope::ok_with(
            "transfer history",
            serde_json::to_value(&records).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }
}

#[async_trait]
impl ApiModule for StudentsModule {
    fn name(&self) -> &'static str {
        "students"
    }

    fn contract(&self) -> ModuleContract {
        let scoped = |spec: OperationSpec| {
            spec.guard(GuardName::Auth).guard(GuardName::RequireSchoolAdmin)
        };
        ModuleContract::new("students")
            .operation(scoped(OperationSpec::new("create")).guard(GuardName::ValidateCreateStudent))
            .operation(scoped(OperationSpec::new("list")))
            // Auth only; the operation enforces school scope itself.
            .operation(OperationSpec::new("get").guard(GuardName::Auth))
            .operation(scoped(OperationSpec::new("update")).guard(GuardName::ValidateUpdateStudent))
            .operation(scoped(OperationSpec::new("remove")))
            .operation(
                OperationSpec::new("transfer")
                    .guard(GuardName::Auth)
                    .guard(GuardName::TransferAccess)
                    .guard(GuardName::ValidateTransferStudent),
            )
            .operation(
                scoped(OperationSpec::new("history").with_verb(HttpVerb::Get)),
            )
    }

    fn operations(&self) -> &'static [&'static str] {
        &[
            "create", "list", "get", "update", "remove", "transfer", "history",
        ]
    }

    async fn handle(
        &self,
        operation: &str,
        ctx: &mut RequestContext,
    ) -> Result<Envelope, ApiError> {
        match operation {
            "create" => self.create(ctx).await,
            "list" => self.list(ctx).await,
            "get" => self.get(ctx).await,
            "update" => self.update(ctx).await,
            "remove" => self.remove(ctx).await,
            "transfer" => self.transfer(ctx).await,
            "history" => self.history(ctx).await,
            _ => Err(ApiError::NotFound("operation".to_string())),
        }
    }
}
