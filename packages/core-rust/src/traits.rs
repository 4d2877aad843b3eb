//! Backend seam: the connection and per-instance handle the gateway dispatches through.

use async_trait::async_trait;
use serde_json::Value;

use crate::definition::{NotificationDefinition, ProcessDefinition, ReadDefinition, UpdateDefinition};
use crate::error::DispatchError;

/// Parameters for starting or executing a process instance.
#[derive(Debug, Clone, PartialEq)]
pub struct StartOptions {
    /// Queue the backend schedules the instance on.
    pub queue: String,
    pub instance_id: String,
    /// Single argument forwarded to the process entry point.
    pub args: Value,
}

/// Connection to a durable-execution backend.
/// Shared read-only across all in-flight requests.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Start a process instance and return its identifier once the backend accepted it.
    async fn start(
        &self,
        definition: &ProcessDefinition,
        options: StartOptions,
    ) -> Result<String, DispatchError>;

    /// Start a process instance and wait for its result.
    async fn execute(
        &self,
        definition: &ProcessDefinition,
        options: StartOptions,
    ) -> Result<Value, DispatchError>;

    /// Address an existing instance. Resolving a handle never contacts the
    /// backend; unknown instances surface as errors from the handle's calls.
    fn handle(&self, instance_id: &str) -> Box<dyn InstanceHandle>;
}

/// Reference to one running or completed process instance.
/// Obtained per request and dropped afterwards.
#[async_trait]
pub trait InstanceHandle: Send + Sync {
    fn instance_id(&self) -> &str;

    /// Deliver a notification.
    async fn signal(
        &self,
        definition: &NotificationDefinition,
        payload: Value,
    ) -> Result<(), DispatchError>;

    /// Read instance state. Must not mutate the instance.
    async fn query(&self, definition: &ReadDefinition, params: Value) -> Result<Value, DispatchError>;

    /// Apply a synchronous update and return its result.
    async fn execute_update(
        &self,
        definition: &UpdateDefinition,
        payload: Value,
    ) -> Result<Value, DispatchError>;

    /// Request cancellation of the instance.
    async fn cancel(&self) -> Result<(), DispatchError>;
}
