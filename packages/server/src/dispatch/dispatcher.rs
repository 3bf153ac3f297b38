//! The dispatcher: one entry point from the transport into business logic.

use serde_json::{Map, Value};
use tracing::{debug, error};

use campus_core::{ApiError, Envelope, HttpVerb, RequestContext};

use super::module::ModuleRegistry;
use super::pipeline::GuardRegistry;
use super::route_table::RouteTable;

/// Resolves, guards, and runs every API request.
///
/// Owns the mounted modules, the guard implementations, and the route table
/// built over them. The transport hands over a parsed request; the
/// dispatcher always hands back an envelope, never a panic or a raw error.
pub struct Dispatcher {
    modules: ModuleRegistry,
    guards: GuardRegistry,
    routes: RouteTable,
}

impl Dispatcher {
    /// Assemble the dispatcher, building and validating the route table.
    ///
    /// # Errors
    ///
    /// Any contract inconsistency found while building the route table.
    pub fn new(modules: ModuleRegistry, guards: GuardRegistry) -> anyhow::Result<Self> {
        let routes = RouteTable::build_checked(&modules, &guards)?;
        Ok(Self {
            modules,
            guards,
            routes,
        })
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Dispatch one request and produce its response envelope.
    pub async fn handle(
        &self,
        module: &str,
        operation: &str,
        verb: HttpVerb,
        body: Map<String, Value>,
        query: Map<String, Value>,
        token: Option<String>,
    ) -> Envelope {
        debug!(module, operation, verb = verb.as_str(), "dispatching");
        match self
            .dispatch(module, operation, verb, body, query, token)
            .await
        {
            Ok(envelope) => envelope,
            Err(err) => {
                if err.is_sanitized() {
                    // The envelope hides the detail; the log keeps it.
                    error!(module, operation, error = %err, "request failed");
                }
                Envelope::from(err)
            }
        }
    }

    async fn dispatch(
        &self,
        module: &str,
        operation: &str,
        verb: HttpVerb,
        body: Map<String, Value>,
        query: Map<String, Value>,
        token: Option<String>,
    ) -> Result<Envelope, ApiError> {
        if !self.routes.has_module(module) {
            return Err(ApiError::NotFound("api module".to_string()));
        }
        // Wrong verb and unknown operation are deliberately the same 404.
        let chain = self
            .routes
            .resolve(module, operation, verb)
            .ok_or_else(|| ApiError::NotFound("operation".to_string()))?;
        let target = self
            .modules
            .get(module)
            .ok_or_else(|| ApiError::Internal(format!("module {module} not mounted")))?
            .clone();

        let mut ctx = RequestContext::new(body, query, token);
        self.guards.run_chain(chain, &mut ctx).await?;
        target.handle(operation, &mut ctx).await
    }
}
