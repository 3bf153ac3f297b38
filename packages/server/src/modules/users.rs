//! User accounts and session lifecycle.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use campus_core::{
    now_millis, ApiError, Envelope, GuardName, ModuleContract, OperationSpec, RequestContext,
    Role, SchoolId, User, UserId,
};

use crate::auth::{hash_password, verify_password, RevocationStore, TokenService};
use crate::dispatch::ApiModule;
use crate::storage::{Page, UserStore};

/// Account management plus login and logout.
pub struct UsersModule {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    revocations: Arc<RevocationStore>,
}

impl UsersModule {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        revocations: Arc<RevocationStore>,
    ) -> Self {
        Self {
            users,
            tokens,
            revocations,
        }
    }

    /// All credential failures collapse into one message so the response
    /// never reveals whether the email exists.
    async fn login(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let invalid = || ApiError::Unauthenticated("invalid credentials".to_string());
        let email = ctx.str_field("email")?;
        let password = ctx.str_field("password")?;

        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(invalid)?;
        if !user.is_active || !verify_password(password, &user.password_hash) {
            return Err(invalid());
        }

        let token = self.tokens.issue(&user)?;
        info!(user = %user.id, "user logged in");
        Ok(Envelope::ok_with(
            "login successful",
            json!({"token": token, "user": user.public()}),
        ))
    }

    async fn logout(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        // The auth guard already verified this token; re-decode for its expiry.
        let token = ctx
            .token
            .as_deref()
            .ok_or_else(|| ApiError::Unauthenticated("no token provided".to_string()))?;
        let claims = self.tokens.verify(token)?;
        self.revocations.revoke(token, claims.exp_millis());
        info!(user = %claims.sub, "user logged out");
        Ok(Envelope::ok("logged out"))
    }

    async fn create(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let email = ctx.str_field("email")?;
        let password = ctx.str_field("password")?;
        // Superadmins come from seeding only; the API mints school admins.
        if ctx.str_field("role")? != "school_admin" {
            return Err(ApiError::invalid("role must be school_admin"));
        }
        let school_id = SchoolId::from(ctx.str_field("school_id").map_err(|_| {
            ApiError::invalid("school_id is required for school admins")
        })?);

        let user = self
            .users
            .insert(User {
                id: UserId::generate(),
                email: email.to_string(),
                password_hash: hash_password(password),
                role: Role::SchoolAdmin,
                school_id: Some(school_id),
                is_active: true,
                created_at: now_millis(),
            })
            .await?;
        Ok(Envelope::created("user created", user.public()))
    }

    async fn list(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let page = Page::clamped(ctx.opt_u64_field("page"), ctx.opt_u64_field("limit"));
        let users = self.users.list(page).await?;
        Ok(Envelope::ok_with(
            "users listed",
            serde_json::to_value(&users).map_err(|e| ApiError::Internal(e.to_string()))?,
        ))
    }

    async fn get(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let principal = ctx.require_principal()?;
        let id = UserId::from(ctx.str_field("id")?);
        // School admins may only inspect their own account.
        if principal.role == Role::SchoolAdmin && principal.id != id {
            return Err(ApiError::Forbidden("access denied".to_string()));
        }
        let user = self.users.get(&id).await?;
        Ok(Envelope::ok_with("user found", user.public()))
    }

    async fn update(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let id = UserId::from(ctx.str_field("id")?);
        let mut user = self.users.get(&id).await?;

        if let Some(email) = ctx.opt_str_field("email") {
            if let Some(other) = self.users.find_by_email(email).await? {
                if other.id != user.id {
                    return Err(ApiError::Conflict("email already in use".to_string()));
                }
            }
            user.email = email.to_string();
        }
        if let Some(active) = ctx.payload.get("is_active").and_then(|v| v.as_bool()) {
            user.is_active = active;
        }

        let user = self.users.update(user).await?;
        Ok(Envelope::ok_with("user updated", user.public()))
    }

    async fn remove(&self, ctx: &RequestContext) -> Result<Envelope, ApiError> {
        let id = UserId::from(ctx.str_field("id")?);
        let user = self.users.remove(&id).await?;
        Ok(Envelope::ok_with("user removed", user.public()))
    }
}

#[async_trait]
impl ApiModule for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    fn contract(&self) -> ModuleContract {
        ModuleContract::new("users")
            .operation(OperationSpec::new("login").guard(GuardName::ValidateLogin))
            .operation(OperationSpec::new("logout").guard(GuardName::Auth))
            .operation(
                OperationSpec::new("create")
                    .guard(GuardName::Auth)
                    .guard(GuardName::RequireSuperadmin)
                    .guard(GuardName::ValidateCreateUser),
            )
            .operation(
                OperationSpec::new("list")
                    .guard(GuardName::Auth)
                    .guard(GuardName::RequireSuperadmin),
            )
            .operation(OperationSpec::new("get").guard(GuardName::Auth))
            .operation(
                OperationSpec::new("update")
                    .guard(GuardName::Auth)
                    .guard(GuardName::RequireSuperadmin)
                    .guard(GuardName::ValidateUpdateUser),
            )
            .operation(
                OperationSpec::new("remove")
                    .guard(GuardName::Auth)
                    .guard(GuardName::RequireSuperadmin),
            )
    }

    fn operations(&self) -> &'static [&'static str] {
        &["login", "logout", "create", "list", "get", "update", "remove"]
    }

    async fn handle(
        &self,
        operation: &str,
        ctx: &mut RequestContext,
    ) -> Result<Envelope, ApiError> {
        match operation {
            "login" => self.login(ctx).await,
            "logout" => self.logout(ctx).await,
            "create" => self.create(ctx).await,
            "list" => self.list(ctx).await,
            "get" => self.get(ctx).await,
            "update" => self.update(ctx).await,
            "remove" => self.remove(ctx).await,
            _ => Err(ApiError::NotFound("operation".to_string())),
        }
    }
}
