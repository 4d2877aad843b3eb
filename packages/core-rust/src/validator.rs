//! Pre-dispatch payload transforms for notification definitions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::definition::{DefinitionId, NotificationDefinition};
use crate::error::DispatchError;

/// Validates a notification payload and returns the payload to forward.
///
/// Returning `Err` rejects the request before the backend is contacted.
pub type Transform = Arc<dyn Fn(Value) -> Result<Value, DispatchError> + Send + Sync>;

/// Associates transforms with notification definitions by [`DefinitionId`].
///
/// Populated while the gateway is wired, then shared read-only behind an
/// `Arc` for the lifetime of the router.
#[derive(Default, Clone)]
pub struct ValidatorRegistry {
    transforms: HashMap<DefinitionId, Transform>,
}

impl ValidatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `transform` with `definition`, replacing any earlier one.
    pub fn register<F>(&mut self, definition: &NotificationDefinition, transform: F)
    where
        F: Fn(Value) -> Result<Value, DispatchError> + Send + Sync + 'static,
    {
        self.transforms.insert(definition.id(), Arc::new(transform));
    }

    #[must_use]
    pub fn lookup(&self, definition: &NotificationDefinition) -> Option<&Transform> {
        self.transforms.get(&definition.id())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("definitions", &self.transforms.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lookup_unregistered_returns_none() {
        let registry = ValidatorRegistry::new();
        assert!(registry.lookup(&NotificationDefinition::new("setDeadline")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn register_then_lookup_applies_transform() {
        let def = NotificationDefinition::new("setDeadline");
        let mut registry = ValidatorRegistry::new();
        registry.register(&def, |mut payload| {
            payload["checked"] = json!(true);
            Ok(payload)
        });

        let transform = registry.lookup(&def).unwrap();
        let out = transform(json!({"deadline": 5})).unwrap();
        assert_eq!(out, json!({"deadline": 5, "checked": true}));
    }

    #[test]
    fn register_overwrites_previous_transform() {
        let def = NotificationDefinition::new("setDeadline");
        let mut registry = ValidatorRegistry::new();
        registry.register(&def, |_| Ok(json!(1)));
        registry.register(&def, |_| Ok(json!(2)));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(&def).unwrap()(Value::Null).unwrap(), json!(2));
    }

    #[test]
    fn transforms_are_scoped_per_definition() {
        let deadline = NotificationDefinition::new("setDeadline");
        let other = NotificationDefinition::new("cancelOrder");
        let mut registry = ValidatorRegistry::new();
        registry.register(&deadline, |_| Err(DispatchError::invalid_argument("nope")));

        assert!(registry.lookup(&other).is_none());
        let err = registry.lookup(&deadline).unwrap()(Value::Null).unwrap_err();
        assert_eq!(err.code, Some(400));
    }
}
