//! Startup-built routing index over every module contract.

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Context};
use tracing::info;

use campus_core::{GuardName, HttpVerb};

use super::module::ModuleRegistry;
use super::pipeline::GuardRegistry;

struct RouteEntry {
    verb: HttpVerb,
    guards: Vec<GuardName>,
}

/// Immutable lookup from `(module, operation, verb)` to a guard chain.
///
/// Built once from the mounted contracts. Construction is all-or-nothing:
/// a contract operation the module does not implement, an implemented
/// operation the contract does not declare, a duplicate declaration, or a
/// guard with no registered implementation all abort startup.
pub struct RouteTable {
    // Nested maps keyed by str so request-scoped &str lookups borrow
    // cleanly and resolved guard slices live as long as the table.
    routes: HashMap<&'static str, HashMap<&'static str, RouteEntry>>,
}

impl RouteTable {
    /// Fold every mounted contract into the table, validating as we go.
    ///
    /// # Errors
    ///
    /// Any contract/implementation mismatch or unregistered guard.
    pub fn build(modules: &ModuleRegistry, guards: &GuardRegistry) -> anyhow::Result<Self> {
        let mut routes: HashMap<&'static str, HashMap<&'static str, RouteEntry>> = HashMap::new();

        for module in modules.iter() {
            let contract = module.contract();
            if contract.module != module.name() {
                bail!(
                    "module {} publishes a contract for {}",
                    module.name(),
                    contract.module
                );
            }
            let entries = routes.entry(module.name()).or_default();

            let implemented: HashSet<&str> = module.operations().iter().copied().collect();
            let mut declared = HashSet::new();

            for spec in &contract.operations {
                if !declared.insert(spec.name) {
                    bail!(
                        "module {} declares operation {} twice",
                        module.name(),
                        spec.name
                    );
                }
                if !implemented.contains(spec.name) {
                    bail!(
                        "module {} declares operation {} but does not implement it",
                        module.name(),
                        spec.name
                    );
                }
                for guard in &spec.guards {
                    if !guards.contains(*guard) {
                        bail!(
                            "operation {}/{} references unregistered guard {guard:?}",
                            module.name(),
                            spec.name
                        );
                    }
                }
                entries.insert(
                    spec.name,
                    RouteEntry {
                        verb: spec.verb,
                        guards: spec.guards.clone(),
                    },
                );
            }

            for name in module.operations() {
                if !declared.contains(name) {
                    bail!(
                        "module {} implements operation {name} but does not declare it",
                        module.name()
                    );
                }
            }
        }

        let operations: usize = routes.values().map(HashMap::len).sum();
        if operations == 0 {
            bail!("no operations mounted");
        }
        info!(
            modules = routes.len(),
            operations, "route table built"
        );
        Ok(Self { routes })
    }

    /// Convenience wrapper with a uniform error prefix.
    ///
    /// # Errors
    ///
    /// See [`RouteTable::build`].
    pub fn build_checked(
        modules: &ModuleRegistry,
        guards: &GuardRegistry,
    ) -> anyhow::Result<Self> {
        Self::build(modules, guards).context("invalid route configuration")
    }

    #[must_use]
    pub fn has_module(&self, module: &str) -> bool {
        self.routes.contains_key(module)
    }

    /// Guard chain for an operation reached under the right verb.
    ///
    /// A known operation addressed with the wrong verb resolves to `None`,
    /// indistinguishable from an unknown operation.
    #[must_use]
    pub fn resolve(&self, module: &str, operation: &str, verb: HttpVerb) -> Option<&[GuardName]> {
        self.routes
            .get(module)?
            .get(operation)
            .filter(|entry| entry.verb == verb)
            .map(|entry| entry.guards.as_slice())
    }

    /// Number of routable operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
