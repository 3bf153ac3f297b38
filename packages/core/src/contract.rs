//! Module contracts: the static declaration binding a business module's
//! operations to HTTP verbs and ordered guard chains.
//!
//! Contracts are built once per module at startup and folded into the route
//! table; nothing here is discovered at runtime.

use serde::{Deserialize, Serialize};

/// HTTP verbs the dispatcher accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    /// Wire representation of the verb.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
        }
    }
}

/// Compile-time-checked guard identifiers.
///
/// Guards are referenced from contracts by variant, never by string, so an
/// unknown guard is unrepresentable and a missing registration is caught
/// when the route table is built — not at first request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardName {
    /// Verify the bearer token and attach the principal.
    Auth,
    /// Allow superadmins only.
    RequireSuperadmin,
    /// Allow superadmins and school admins.
    RequireSchoolAdmin,
    /// Transfer-specific ownership check; attaches the student.
    TransferAccess,
    ValidateLogin,
    ValidateCreateUser,
    ValidateUpdateUser,
    ValidateCreateSchool,
    ValidateUpdateSchool,
    ValidateCreateClassroom,
    ValidateUpdateClassroom,
    ValidateCreateStudent,
    ValidateUpdateStudent,
    ValidateTransferStudent,
}

/// One reachable operation: its name, verb, and ordered guard chain.
#[derive(Debug, Clone)]
pub struct OperationSpec {
    pub name: &'static str,
    pub verb: HttpVerb,
    pub guards: Vec<GuardName>,
}

impl OperationSpec {
    /// Declare an operation, inferring the verb from its conventional name.
    ///
    /// The mapping is stable because clients depend on it:
    /// `list`/`get` → GET, `create` → POST, `update` → PUT,
    /// `remove` → DELETE, anything else → POST.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        let verb = match name {
            "list" | "get" => HttpVerb::Get,
            "update" => HttpVerb::Put,
            "remove" => HttpVerb::Delete,
            _ => HttpVerb::Post,
        };
        Self {
            name,
            verb,
            guards: Vec::new(),
        }
    }

    /// Override the inferred verb.
    #[must_use]
    pub fn with_verb(mut self, verb: HttpVerb) -> Self {
        self.verb = verb;
        self
    }

    /// Append a guard to the chain. Order is execution order.
    #[must_use]
    pub fn guard(mut self, guard: GuardName) -> Self {
        self.guards.push(guard);
        self
    }
}

/// Declarative metadata for one business module.
#[derive(Debug, Clone)]
pub struct ModuleContract {
    pub module: &'static str,
    pub operations: Vec<OperationSpec>,
}

impl ModuleContract {
    #[must_use]
    pub fn new(module: &'static str) -> Self {
        Self {
            module,
            operations: Vec::new(),
        }
    }

    /// Add an operation to the contract.
    #[must_use]
    pub fn operation(mut self, spec: OperationSpec) -> Self {
        self.operations.push(spec);
        self
    }
}
