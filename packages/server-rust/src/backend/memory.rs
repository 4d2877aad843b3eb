//! In-memory durable-execution backend.
//!
//! Processes are plain state machines ([`ProcessLogic`]) registered by process
//! name. Instances live in a `DashMap` keyed by instance id, each behind its
//! own mutex, so calls against different instances never contend. Nothing is
//! persisted; this backend exists for tests and local demos.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use waypoint_core::{
    Connection, DispatchError, InstanceHandle, NotificationDefinition, ProcessDefinition,
    ReadDefinition, StartOptions, UpdateDefinition,
};

/// Behaviour of one process type. Default handlers reject unknown operations.
pub trait ProcessLogic: Send + 'static {
    /// Handle a notification.
    ///
    /// # Errors
    ///
    /// Returns a 400 `DispatchError` unless overridden.
    fn on_signal(&mut self, signal: &str, payload: Value) -> Result<(), DispatchError> {
        let _ = payload;
        Err(unknown_operation("signal", signal))
    }

    /// Answer a read. Must not change state.
    ///
    /// # Errors
    ///
    /// Returns a 400 `DispatchError` unless overridden.
    fn on_query(&self, query: &str, params: &Value) -> Result<Value, DispatchError> {
        let _ = params;
        Err(unknown_operation("query", query))
    }

    /// Apply an update and return its result.
    ///
    /// # Errors
    ///
    /// Returns a 400 `DispatchError` unless overridden.
    fn on_update(&mut self, update: &str, payload: Value) -> Result<Value, DispatchError> {
        let _ = payload;
        Err(unknown_operation("update", update))
    }

    /// Result reported when the process is executed rather than started.
    fn output(&self) -> Value {
        Value::Null
    }
}

type ProcessFactory = Arc<dyn Fn(&Value) -> Result<Box<dyn ProcessLogic>, DispatchError> + Send + Sync>;

/// Lifecycle state of an in-memory instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    Running,
    Cancelled,
}

struct Instance {
    queue: String,
    status: InstanceStatus,
    logic: Box<dyn ProcessLogic>,
}

#[derive(Default)]
struct EngineState {
    factories: DashMap<String, ProcessFactory>,
    instances: DashMap<String, Arc<Mutex<Instance>>>,
}

/// Cheaply cloneable in-memory backend implementing [`Connection`].
///
/// Instances are kept until [`remove`](Self::remove) is called, including
/// cancelled ones, so memory grows with every start. Long-running hosts must
/// evict finished instances themselves.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<EngineState>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the factory used to create instances of process `name`.
    /// The factory receives the start arguments.
    pub fn register_process<F, L>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Value) -> Result<L, DispatchError> + Send + Sync + 'static,
        L: ProcessLogic,
    {
        let boxed: ProcessFactory = Arc::new(move |args: &Value| {
            factory(args).map(|logic| Box::new(logic) as Box<dyn ProcessLogic>)
        });
        self.state.factories.insert(name.into(), boxed);
    }

    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.state.instances.len()
    }

    #[must_use]
    pub fn status(&self, instance_id: &str) -> Option<InstanceStatus> {
        self.state
            .instances
            .get(instance_id)
            .map(|entry| entry.value().lock().status)
    }

    /// Queue the instance was started on.
    #[must_use]
    pub fn queue_of(&self, instance_id: &str) -> Option<String> {
        self.state
            .instances
            .get(instance_id)
            .map(|entry| entry.value().lock().queue.clone())
    }

    /// Evicts an instance, returning its last status. Later calls against the
    /// id answer 404, and the id may be started again.
    pub fn remove(&self, instance_id: &str) -> Option<InstanceStatus> {
        self.state
            .instances
            .remove(instance_id)
            .map(|(_, instance)| instance.lock().status)
    }

    fn spawn(
        &self,
        definition: &ProcessDefinition,
        options: StartOptions,
    ) -> Result<Arc<Mutex<Instance>>, DispatchError> {
        let factory = self
            .state
            .factories
            .get(&definition.name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                DispatchError::not_found(format!("no process registered as {}", definition.name))
            })?;

        match self.state.instances.entry(options.instance_id) {
            Entry::Occupied(entry) => Err(DispatchError::conflict(format!(
                "process {} already started",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                let logic = factory(&options.args)?;
                let instance = Arc::new(Mutex::new(Instance {
                    queue: options.queue,
                    status: InstanceStatus::Running,
                    logic,
                }));
                tracing::debug!(instance_id = %entry.key(), process = %definition.name, "instance started");
                entry.insert(Arc::clone(&instance));
                Ok(instance)
            }
        }
    }

    fn instance(&self, instance_id: &str) -> Result<Arc<Mutex<Instance>>, DispatchError> {
        self.state
            .instances
            .get(instance_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| DispatchError::not_found(format!("process {instance_id} not found")))
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("processes", &self.state.factories.len())
            .field("instances", &self.state.instances.len())
            .finish()
    }
}

#[async_trait]
impl Connection for MemoryBackend {
    async fn start(
        &self,
        definition: &ProcessDefinition,
        options: StartOptions,
    ) -> Result<String, DispatchError> {
        let instance_id = options.instance_id.clone();
        self.spawn(definition, options)?;
        Ok(instance_id)
    }

    async fn execute(
        &self,
        definition: &ProcessDefinition,
        options: StartOptions,
    ) -> Result<Value, DispatchError> {
        let instance = self.spawn(definition, options)?;
        let output = instance.lock().logic.output();
        Ok(output)
    }

    fn handle(&self, instance_id: &str) -> Box<dyn InstanceHandle> {
        Box::new(MemoryHandle {
            backend: self.clone(),
            instance_id: instance_id.to_string(),
        })
    }
}

struct MemoryHandle {
    backend: MemoryBackend,
    instance_id: String,
}

#[async_trait]
impl InstanceHandle for MemoryHandle {
    fn instance_id(&self) -> &str {
        &self.instance_id
    }

    async fn signal(
        &self,
        definition: &NotificationDefinition,
        payload: Value,
    ) -> Result<(), DispatchError> {
        let instance = self.backend.instance(&self.instance_id)?;
        let mut guard = instance.lock();
        ensure_running(guard.status, &self.instance_id)?;
        guard.logic.on_signal(&definition.name, payload)
    }

    async fn query(&self, definition: &ReadDefinition, params: Value) -> Result<Value, DispatchError> {
        let instance = self.backend.instance(&self.instance_id)?;
        let guard = instance.lock();
        guard.logic.on_query(&definition.name, &params)
    }

    async fn execute_update(
        &self,
        definition: &UpdateDefinition,
        payload: Value,
    ) -> Result<Value, DispatchError> {
        let instance = self.backend.instance(&self.instance_id)?;
        let mut guard = instance.lock();
        ensure_running(guard.status, &self.instance_id)?;
        guard.logic.on_update(&definition.name, payload)
    }

    async fn cancel(&self) -> Result<(), DispatchError> {
        let instance = self.backend.instance(&self.instance_id)?;
        let mut guard = instance.lock();
        ensure_running(guard.status, &self.instance_id)?;
        guard.status = InstanceStatus::Cancelled;
        tracing::debug!(instance_id = %self.instance_id, "instance cancelled");
        Ok(())
    }
}

fn unknown_operation(kind: &str, name: &str) -> DispatchError {
    DispatchError::invalid_argument(format!("process does not handle {kind} {name}"))
}

fn ensure_running(status: InstanceStatus, instance_id: &str) -> Result<(), DispatchError> {
    match status {
        InstanceStatus::Running => Ok(()),
        InstanceStatus::Cancelled => Err(DispatchError::conflict(format!(
            "process {instance_id} is not running"
        ))),
    }
}
