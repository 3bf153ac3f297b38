//! School management. Every operation is superadmin-only.

use std::sync::Arc;

use async_trait::async_trait;

use campus_core::{
    now_millis, ApiError, Envelope, GuardName, ModuleContract, OperationSpec, RequestContext,
    School, SchoolId,
};

use crate::dispatch::ApiModule;
use crate::storage::{Page, SchoolStore};

pub struct SchoolsModule {
    schools: Arc<dyn SchoolStore>,
}

impl SchoolsModule {
    #[must_use]
    pub fn new(schools: Arc<dyn SchoolStore>) -> Self {
        Self { schools }
    }

    async fn create(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?;
        let school = self
            .schools
            .insert(School {
                id: SchoolId::generate(),
                name: ctx.str_field("name")?.to_string(),
                address: ctx.str_field("address")?.to_string(),
                contact_email: ctx.str_field("contact_email")?.to_string(),
                phone: ctx.str_field("phone")?.to_string(),
                created_by: principal.id.clone(),
                created_at: now_millis(),
            })
            .await?;
        Ok(Envelope::created(
            "school created",
            serde_json::to_value(&school).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }

    async fn list(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let page = Page::clamped(ctx.opt_u64_field("page"), ctx.opt_u64_field("limit"));
        let schools = self.schools.list(page).await?;
        Ok(Envelope::ok_with(
            "schools listed",
            serde_json::to_value(&schools).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }

    async fn get(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let id = SchoolId::from(ctx.str_field("id")?);
        let school = self.schools.get(&id).await?;
        Ok(Envelope::ok_with(
            "school found",
            serde_json::to_value(&school).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }

    async fn update(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let id = SchoolId::from(ctx.str_field("id")?);
        let mut school = self.schools.get(&id).await?;

        if let Some(name) = ctx.opt_str_field("name") {
            school.name = name.to_string();
        }
        if let Some(address) = ctx.opt_str_field("address") {
            school.address = address.to_string();
        }
        if let Some(email) = ctx.opt_str_field("contact_email") {
            school.contact_email = email.to_string();
        }
        if let Some(phone) = ctx.opt_str_field("phone") {
            school.phone = phone.to_string();
        }

        let school = self.schools.update(school).await?;
        Ok(Envelope::ok_with(
            "school updated",
            serde_json::to_value(&school).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }

    async fn remove(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let id = SchoolId::from(ctx.str_field("id")?);
        self.schools.remove(&id).await?;
        Ok(Envelope::ok("school removed"))
    }
}

#[async_trait]
impl ApiModule for SchoolsModule {
    fn name(&self) -> &'static str {
        "schools"
    }

    fn contract(&self) -> ModuleContract {
        let admin_only = |spec: OperationSpec| {
            spec.guard(GuardName::Auth).guard(GuardName::RequireSuperadmin)
        };
        ModuleContract::new("schools")
            .operation(admin_only(OperationSpec::new("create")).guard(GuardName::ValidateCreateSchool))
            .operation(admin_only(OperationSpec::new("list")))
            // Any authenticated user may look a school up.
            .operation(OperationSpec::new("get").guard(GuardName::Auth))
            .operation(admin_only(OperationSpec::new("update")).guard(GuardName::ValidateUpdateSchool))
            .operation(admin_only(OperationSpec::new("remove")))
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

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use campus_core::{Principal, Role, UserId};

    use crate::storage::MemorySchoolStore;

    use super::*;

    fn superadmin_ctx(payload: Value) -> RequestContext {
        let mut ctx = match payload {
            Value::Object(m) => RequestContext::new(m, Map::new(), None),
            _ => unreachable!(),
        };
        ctx.principal = Some(Principal {
            id: UserId::from("u-root"),
            role: Role::Superadmin,
            school_id: None,
        });
        ctx
    }

    fn module() -> SchoolsModule {
        SchoolsModule::new(Arc::new(MemorySchoolStore::new()))
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let module = module();
        let created = module
            .create(&superadmin_ctx(json!({
                "name": "Northside High",
                "address": "1 North Rd",
                "contact_email": "office@northside.edu",
                "phone": "555-0101",
            })))
            .await
            .unwrap();
        assert_eq!(created.code, 201);
        let id = created.data.unwrap()["id"].as_str().unwrap().to_string();

        let fetched = module.get(&superadmin_ctx(json!({"id": id}))).await.unwrap();
        assert_eq!(fetched.data.unwrap()["name"], "Northside High");
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let module = module();
        let payload = json!({
            "name": "Northside High",
            "address": "1 North Rd",
            "contact_email": "office@northside.edu",
            "phone": "555-0101",
        });
        module.create(&superadmin_ctx(payload.clone())).await.unwrap();
        let err = module.create(&superadmin_ctx(payload)).await.unwrap_err();
        assert_eq!(err.code(), 409);
    }

    #[tokio::test]
    async fn update_patches_only_supplied_fields() {
        let module = module();
        let created = module
            .create(&superadmin_ctx(json!({
                "name": "Northside High",
                "address": "1 North Rd",
                "contact_email": "office@northside.edu",
                "phone": "555-0101",
            })))
            .await
            .unwrap();
        let id = created.data.unwrap()["id"].as_str().unwrap().to_string();

        let updated = module
            .update(&superadmin_ctx(json!({"id": id, "phone": "555-0202"})))
            .await
            .unwrap();
        let data = updated.data.unwrap();
        assert_eq!(data["phone"], "555-0202");
        assert_eq!(data["name"], "Northside High");
    }

    #[tokio::test]
    async fn unknown_school_is_a_404() {
        let module = module();
        let err = module
            .get(&superadmin_ctx(json!({"id": "nope"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), 404);
    }
}
