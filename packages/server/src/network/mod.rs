//! HTTP transport over the dispatcher.

pub mod http;

pub use http::ApiServer;
