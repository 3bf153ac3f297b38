//! Role-based authorization guards.

use async_trait::async_trait;

use campus_core::{ApiError, RequestContext, Role};

use crate::dispatch::Guard;

/// Passes only principals whose role is in the allowed set.
///
/// Always runs after [`AuthGuard`](crate::guards::AuthGuard); a context
/// without a principal fails closed.
pub struct RoleGuard {
    allowed: &'static [Role],
}

impl RoleGuard {
    /// Superadmins only.
    #[must_use]
    pub fn superadmin_only() -> Self {
        Self {
            allowed: &[Role::Superadmin],
        }
    }

    /// Superadmins and school admins.
    #[must_use]
    pub fn school_admin() -> Self {
        Self {
            allowed: &[Role::Superadmin, Role::SchoolAdmin],
        }
    }
}

#[async_trait]
impl Guard for RoleGuard {
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        let principal = ctx.require_principal()?;
        if self.allowed.contains(&principal.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("access denied".to_string()))
        }
    }
}
