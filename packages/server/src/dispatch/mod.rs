//! Request-dispatch framework.
//!
//! Business modules declare a static contract (operations, verbs, guard
//! chains); the route table folds every contract into verb and guard lookup
//! maps at startup and refuses to start on any inconsistency. At request
//! time the [`Dispatcher`] resolves `(module, operation, verb)`, runs the
//! guard chain, and invokes the operation, turning every outcome into a
//! response envelope.

pub mod dispatcher;
pub mod module;
pub mod pipeline;
pub mod route_table;

pub use dispatcher::Dispatcher;
pub use module::{ApiModule, ModuleRegistry};
pub use pipeline::{Guard, GuardRegistry};
pub use route_table::RouteTable;
