//! Classroom management, scoped to the caller's school for school admins.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use campus_core::{
    now_millis, ApiError, Classroom, ClassroomId, Envelope, GuardName, ModuleContract,
    OperationSpec, Principal, RequestContext, Role, SchoolId,
};

use crate::dispatch::ApiModule;
use crate::storage::{ClassroomStore, Page, SchoolStore};

pub struct ClassroomsModule {
    classrooms: Arc<dyn ClassroomStore>,
    schools: Arc<dyn SchoolStore>,
}

impl ClassroomsModule {
    #[must_use]
    pub fn new(classrooms: Arc<dyn ClassroomStore>, schools: Arc<dyn SchoolStore>) -> Self {
        Self {
            classrooms,
            schools,
        }
    }

    /// School a write should land in: school admins always act on their own
    /// school, superadmins must name one.
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

    fn courses_from(ctx: &RequestContext) -> Option<Vec<String>> {
        ctx.payload.get("courses").and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    }

    async fn create(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?;
        let school_id = Self::target_school(principal, ctx)?;
        self.schools
            .get(&school_id)
            .await
            .map_err(|_| ApiError::NotFound("school".to_string()))?;

        let capacity = ctx
            .opt_u64_field("capacity")
            .and_then(|c| u32::try_from(c).ok());
        let classroom = self
            .classrooms
            .insert(Classroom {
                id: ClassroomId::generate(),
                name: ctx.str_field("name")?.to_string(),
                code: ctx.str_field("code")?.to_string(),
                school_id,
                capacity,
                courses: Self::courses_from(ctx).unwrap_or_default(),
                created_by: principal.id.clone(),
                created_at: now_millis(),
            })
            .await?;
        Ok(Envelope::created(
            "classroom created",
            serde_json::to_value(&classroom).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }

    async fn list(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?;
        // School admins always see their own school; superadmins may filter.
        let filter = match (&principal.role, &principal.school_id) {
            (Role::SchoolAdmin, Some(school)) => Some(school.clone()),
            (Role::SchoolAdmin, None) => {
                return Err(ApiError::Forbidden("access denied".to_string()))
            }
            (Role::Superadmin, _) => ctx.opt_str_field("school_id").map(SchoolId::from),
        };
        let page = Page::clamped(ctx.opt_u64_field("page"), ctx.opt_u64_field("limit"));
        let classrooms = self.classrooms.list(filter.as_ref(), page).await?;
        Ok(Envelope::ok_with(
            "classrooms listed",
            serde_json::to_value(&classrooms).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }

    async fn get(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?;
        let id = ClassroomId::from(ctx.str_field("id")?);
        let classroom = self.classrooms.get(&id).await?;
        Self::assert_in_scope(principal, &classroom.school_id)?;
        Ok(Envelope::ok_with(
            "classroom found",
            serde_json::to_value(&classroom).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }

    async fn update(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?;
        let id = ClassroomId::from(ctx.str_field("id")?);
        let mut classroom = self.classrooms.get(&id).await?;
        Self::assert_in_scope(principal, &classroom.school_id)?;

        if let Some(name) = ctx.opt_str_field("name") {
            classroom.name = name.to_string();
        }
        if let Some(code) = ctx.opt_str_field("code") {
            classroom.code = code.to_string();
        }
        if let Some(capacity) = ctx.opt_u64_field("capacity") {
            classroom.capacity = u32::try_from(capacity).ok();
        }
        if let Some(courses) = Self::courses_from(ctx) {
            classroom.courses = courses;
        }

        let classroom = self.classrooms.update(classroom).await?;
        Ok(Envelope::ok_with(
            "classroom updated",
            serde_json::to_value(&classroom).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }

    async fn remove(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?;
        let id = ClassroomId::from(ctx.str_field("id")?);
        let classroom = self.classrooms.get(&id).await?;
        Self::assert_in_scope(principal, &classroom.school_id)?;
        self.classrooms.remove(&id).await?;
        Ok(Envelope::ok("classroom removed"))
    }
}

#[async_trait]
impl ApiModule for ClassroomsModule {
    fn name(&self) -> &'static str {
        "classrooms"
    }

    fn contract(&self) -> ModuleContract {
        let scoped = |spec: OperationSpec| {
            spec.guard(GuardName::Auth).guard(GuardName::RequireSchoolAdmin)
        };
        ModuleContract::new("classrooms")
            .operation(scoped(OperationSpec::new("create")).guard(GuardName::ValidateCreateClassroom))
            .operation(scoped(OperationSpec::new("list")))
            // Auth only; the operation enforces school scope itself.
            .operation(OperationSpec::new("get").guard(GuardName::Auth))
            .operation(scoped(OperationSpec::new("update")).guard(GuardName::ValidateUpdateClassroom))
            .operation(scoped(OperationSpec::new("remove")))
    }

    fn operations(&self) -> &'static [&'static str] {
        &["create", "list", "get", "update", "remove"]
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
            _ => Err(ApiError::NotFound("operation".to_string())),
        }
    }
}
