//! Guard implementations referenced by module contracts.
//!
//! Ordering convention within a chain: authentication first, then
//! authorization, then validation, so later guards can rely on the
//! principal (and, for transfers, the pre-fetched student) already being
//! attached to the context.

pub mod auth;
pub mod rbac;
pub mod transfer_access;
pub mod validate;

pub use auth::AuthGuard;
pub use rbac::RoleGuard;
pub use transfer_access::TransferAccessGuard;
pub use validate::{SchemaGuard, TransferValidationGuard};
