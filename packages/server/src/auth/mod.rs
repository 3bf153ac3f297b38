//! Credential plumbing: signed bearer tokens, the revocation store, and
//! password digests.

pub mod password;
pub mod revocation;
pub mod token;

pub use password::{hash_password, verify_password};
pub use revocation::RevocationStore;
pub use token::{Claims, TokenService};
