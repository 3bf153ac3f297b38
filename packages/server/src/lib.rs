//! Campus Server — module dispatch framework, guard pipeline, business
//! modules, and the HTTP transport for the school management API.

pub mod app;
pub mod auth;
pub mod config;
pub mod dispatch;
pub mod guards;
pub mod modules;
pub mod network;
pub mod storage;

pub use app::{build_app, build_dispatcher, seed_superadmin, App, Stores};
pub use config::ServerConfig;
pub use dispatch::{ApiModule, Dispatcher, Guard, GuardRegistry, ModuleRegistry, RouteTable};
pub use network::ApiServer;
