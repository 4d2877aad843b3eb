//! Listener bootstrap and HTTP-level middleware for serving a gateway router.

pub mod config;
pub mod middleware;
pub mod module;

pub use config::NetworkConfig;
pub use middleware::{build_http_layers, with_http_layers};
pub use module::NetworkModule;
