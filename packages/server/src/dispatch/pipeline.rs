//! Guard trait and the sequential, short-circuiting chain executor.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use campus_core::{ApiError, GuardName, RequestContext};

/// One link in an operation's guard chain.
///
/// Guards run in declared order, each seeing the context as left by its
/// predecessors. A guard either passes (possibly enriching the context) or
/// fails with the error that becomes the response; the operation never runs
/// after a failure.
#[async_trait]
pub trait Guard: Send + Sync {
    /// Pass, or fail the request.
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), ApiError>;
}

/// Guard implementations keyed by [`GuardName`].
///
/// Filled once at startup; the route table verifies every name referenced
/// by a contract resolves here before the server accepts traffic.
#[derive(Default)]
pub struct GuardRegistry {
    guards: HashMap<GuardName, Arc<dyn Guard>>,
}

impl GuardRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: GuardName, guard: Arc<dyn Guard>) {
        self.guards.insert(name, guard);
    }

    #[must_use]
    pub fn contains(&self, name: GuardName) -> bool {
        self.guards.contains_key(&name)
    }

    /// Run a chain in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// The failing guard's error, or `Internal` for a name with no
    /// registered implementation (unreachable once the route table has
    /// validated the contracts).
    pub async fn run_chain(
        &self,
        chain: &[GuardName],
        ctx: &mut RequestContext,
    ) -> Result<(), ApiError> {
        for name in chain {
            let guard = self.guards.get(name).ok_or_else(|| {
                ApiError::Internal(format!("guard {name:?} is not registered"))
            })?;
            if let Err(err) = guard.check(ctx).await {
                debug!(guard = ?name, error = %err, "guard rejected request");
                return Err(err);
            }
        }
        Ok(())
    }
}
