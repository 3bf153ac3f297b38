//! Business module trait and the registry the dispatcher resolves against.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use campus_core::{ApiError, Envelope, ModuleContract, RequestContext};

/// One mounted business module.
///
/// A module declares its reachable surface twice: [`contract`] binds
/// operation names to verbs and guard chains, and [`operations`] lists the
/// names [`handle`] actually implements. The route table cross-checks the
/// two at startup so a contract entry without an implementation (or the
/// reverse) is a boot failure, not a 500 at first request.
///
/// [`contract`]: ApiModule::contract
/// [`operations`]: ApiModule::operations
/// [`handle`]: ApiModule::handle
#[async_trait]
pub trait ApiModule: Send + Sync {
    /// URL segment the module is mounted under.
    fn name(&self) -> &'static str;

    /// Static declaration of operations, verbs, and guard chains.
    fn contract(&self) -> ModuleContract;

    /// Operation names `handle` implements.
    fn operations(&self) -> &'static [&'static str];

    /// Run one operation against an already-guarded context.
    async fn handle(
        &self,
        operation: &str,
        ctx: &mut RequestContext,
    ) -> Result<Envelope, ApiError>;
}

/// Mounted modules, keyed by name.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<&'static str, Arc<dyn ApiModule>>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a module. Re-registering a name replaces the previous module.
    pub fn register(&mut self, module: Arc<dyn ApiModule>) {
        self.modules.insert(module.name(), module);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ApiModule>> {
        self.modules.get(name)
    }

    /// All mounted modules, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ApiModule>> {
        self.modules.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use campus_core::OperationSpec;

    use super::*;

    struct PingModule;

    #[async_trait]
    impl ApiModule for PingModule {
        fn name(&self) -> &'static str {
            "ping"
        }

        fn contract(&self) -> ModuleContract {
            ModuleContract::new("ping").operation(OperationSpec::new("echo"))
        }

        fn operations(&self) -> &'static [&'static str] {
            &["echo"]
        }

        async fn handle(
            &self,
            operation: &str,
            _ctx: &mut RequestContext,
        ) -> Result<Envelope, ApiError> {
            match operation {
                "echo" => Ok(Envelope::ok("pong")),
                _ => Err(ApiError::NotFound("operation".to_string())),
            }
        }
    }

    #[test]
    fn registry_resolves_by_name() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(PingModule));
        assert!(registry.get("ping").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn module_dispatches_its_own_operations() {
        let module = PingModule;
        let mut ctx = RequestContext::default();
        let envelope = module.handle("echo", &mut ctx).await.unwrap();
        assert!(envelope.success);
        assert!(module.handle("nope", &mut ctx).await.is_err());
    }
}
