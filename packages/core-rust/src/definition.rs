//! Operation definitions: the four kinds of backend operation a catalog can expose.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a backend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// A long-running process started (or executed) on a queue.
    Process,
    /// A fire-and-forget message delivered to a running instance.
    Notification,
    /// A non-mutating state query against an instance.
    Read,
    /// A synchronous, mutating call that returns a result.
    Update,
}

impl OperationKind {
    /// Returns the lowercase label used in logs and route reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Notification => "notification",
            Self::Read => "read",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a definition: its kind plus its declared name.
///
/// Two definitions of different kinds may share a name without colliding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId {
    pub kind: OperationKind,
    pub name: String,
}

impl DefinitionId {
    #[must_use]
    pub fn new(kind: OperationKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// How a process route answers once the backend accepted the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Start the process and respond as soon as the backend acknowledges it.
    #[default]
    Start,
    /// Execute the process and respond with its final result.
    #[serde(alias = "await")]
    AwaitCompletion,
}

/// A long-running process entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    /// Process type name as known to the backend.
    pub name: String,
    #[serde(default)]
    pub completion: CompletionPolicy,
}

impl ProcessDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            completion: CompletionPolicy::Start,
        }
    }

    /// Switches the route to execute-and-await instead of start-and-respond.
    #[must_use]
    pub fn awaiting_completion(mut self) -> Self {
        self.completion = CompletionPolicy::AwaitCompletion;
        self
    }

    #[must_use]
    pub fn id(&self) -> DefinitionId {
        DefinitionId::new(OperationKind::Process, &self.name)
    }
}

/// Declares a definition type that carries only a name.
macro_rules! named_definition {
    ($(#[$meta:meta])* $ty:ident => $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $ty {
            pub name: String,
        }

        impl $ty {
            #[must_use]
            pub fn new(name: impl Into<String>) -> Self {
                Self { name: name.into() }
            }

            #[must_use]
            pub fn id(&self) -> DefinitionId {
                DefinitionId::new($kind, &self.name)
            }
        }
    };
}

named_definition!(
    /// A notification (signal) delivered to a running process instance.
    NotificationDefinition => OperationKind::Notification
);
named_definition!(
    /// A read (query) answered by a process instance.
    ReadDefinition => OperationKind::Read
);
named_definition!(
    /// A synchronous update applied to a process instance.
    UpdateDefinition => OperationKind::Update
);

/// A classified catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationDefinition {
    Process(ProcessDefinition),
    Notification(NotificationDefinition),
    Read(ReadDefinition),
    Update(UpdateDefinition),
}

impl OperationDefinition {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Process(_) => OperationKind::Process,
            Self::Notification(_) => OperationKind::Notification,
            Self::Read(_) => OperationKind::Read,
            Self::Update(_) => OperationKind::Update,
        }
    }

    /// The declared name of the definition.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Process(d) => &d.name,
            Self::Notification(d) => &d.name,
            Self::Read(d) => &d.name,
            Self::Update(d) => &d.name,
        }
    }

    #[must_use]
    pub fn id(&self) -> DefinitionId {
        DefinitionId::new(self.kind(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_distinguish_kinds_with_equal_names() {
        let signal = NotificationDefinition::new("approve");
        let update = UpdateDefinition::new("approve");
        assert_ne!(signal.id(), update.id());
        assert_eq!(signal.id(), NotificationDefinition::new("approve").id());
    }

    #[test]
    fn process_defaults_to_start() {
        let def = ProcessDefinition::new("orderProcess");
        assert_eq!(def.completion, CompletionPolicy::Start);
        assert_eq!(
            def.awaiting_completion().completion,
            CompletionPolicy::AwaitCompletion
        );
    }

    #[test]
    fn operation_definition_exposes_kind_and_name() {
        let def = OperationDefinition::Read(ReadDefinition::new("timeLeft"));
        assert_eq!(def.kind(), OperationKind::Read);
        assert_eq!(def.name(), "timeLeft");
        assert_eq!(def.id().to_string(), "read:timeLeft");
    }

    #[test]
    fn completion_policy_accepts_await_alias() {
        let def: ProcessDefinition =
            serde_json::from_str(r#"{"name":"p","completion":"await"}"#).unwrap();
        assert_eq!(def.completion, CompletionPolicy::AwaitCompletion);
    }
}
