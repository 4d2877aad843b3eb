//! Catalog-driven HTTP gateway.
//!
//! The gateway is generated once, at wiring time:
//!
//! 1. **Classification** (`waypoint_core::catalog`): catalog entries become
//!    `OperationDefinition`s; unrelated entries are skipped
//! 2. **Route synthesis** (`builder`, `routes`): one route family per
//!    definition, first registration wins on method+path collisions
//! 3. **Dispatch** (`dispatch`): per request, resolve the instance handle,
//!    run the optional validator, call the backend within the timeout budget
//! 4. **Translation** (`translate`): every failure becomes `{ message, issues? }`

pub mod builder;
pub mod config;
mod dispatch;
pub mod error;
pub mod routes;
pub mod translate;

pub use builder::{build_gateway, Gateway, GatewayBuilder};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use routes::{RouteDescriptor, RouteKind};
pub use translate::{error_response, translate, ErrorBody};
