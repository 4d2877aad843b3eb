//! Waypoint Core: operation definitions, catalogs, backend traits, and validators.

pub mod catalog;
pub mod definition;
pub mod error;
pub mod id;
pub mod traits;
pub mod validator;

pub use catalog::{classify, CatalogEntry, Classification, OperationCatalog};
pub use definition::{
    CompletionPolicy, DefinitionId, NotificationDefinition, OperationDefinition, OperationKind,
    ProcessDefinition, ReadDefinition, UpdateDefinition,
};
pub use error::{CatalogError, DispatchError};
pub use id::new_instance_id;
pub use traits::{Connection, InstanceHandle, StartOptions};
pub use validator::{Transform, ValidatorRegistry};
