//! Waypoint Server: catalog-driven HTTP gateway over a durable-execution backend.

pub mod backend;
pub mod demo;
pub mod gateway;
pub mod network;

pub use gateway::{build_gateway, Gateway, GatewayBuilder, GatewayConfig, GatewayError};
pub use network::{NetworkConfig, NetworkModule};
