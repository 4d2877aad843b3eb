//! Operation catalog and classification.
//!
//! A catalog maps caller-chosen keys to entries. Entries are either operation
//! definitions or unrelated values that happen to live alongside them (helper
//! constants in a manifest, for instance); classification turns the former into
//! [`OperationDefinition`]s and skips the latter.

use serde_json::Value;

use crate::definition::{
    CompletionPolicy, NotificationDefinition, OperationDefinition, ProcessDefinition,
    ReadDefinition, UpdateDefinition,
};
use crate::error::CatalogError;

/// One entry of an [`OperationCatalog`].
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEntry {
    Process(ProcessDefinition),
    Notification(NotificationDefinition),
    Read(ReadDefinition),
    Update(UpdateDefinition),
    /// A value that is not an operation definition. Never routed.
    Unrelated(Value),
}

impl CatalogEntry {
    /// Interprets a raw manifest value by its shape.
    ///
    /// Objects whose `type` is `process`/`workflow`, `signal`, `query` or
    /// `update` become the matching definition. Processes fall back to `key`
    /// when they carry no `name`; the other kinds require one. Everything else
    /// is [`CatalogEntry::Unrelated`].
    #[must_use]
    pub fn from_value(key: &str, value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::Unrelated(value.clone());
        };
        let name = object.get("name").and_then(Value::as_str);

        match (object.get("type").and_then(Value::as_str), name) {
            (Some("process" | "workflow"), _) => {
                let completion = match object.get("completion") {
                    None | Some(Value::Null) => CompletionPolicy::default(),
                    Some(raw) => serde_json::from_value::<CompletionPolicy>(raw.clone())
                        .unwrap_or_else(|_| {
                            tracing::warn!(
                                key,
                                completion = %raw,
                                "unrecognised completion policy, falling back to start"
                            );
                            CompletionPolicy::default()
                        }),
                };
                Self::Process(ProcessDefinition {
                    name: name.unwrap_or(key).to_string(),
                    completion,
                })
            }
            (Some("signal"), Some(name)) => {
                Self::Notification(NotificationDefinition::new(name))
            }
            (Some("query"), Some(name)) => Self::Read(ReadDefinition::new(name)),
            (Some("update"), Some(name)) => Self::Update(UpdateDefinition::new(name)),
            _ => Self::Unrelated(value.clone()),
        }
    }
}

impl From<ProcessDefinition> for CatalogEntry {
    fn from(def: ProcessDefinition) -> Self {
        Self::Process(def)
    }
}

impl From<NotificationDefinition> for CatalogEntry {
    fn from(def: NotificationDefinition) -> Self {
        Self::Notification(def)
    }
}

impl From<ReadDefinition> for CatalogEntry {
    fn from(def: ReadDefinition) -> Self {
        Self::Read(def)
    }
}

impl From<UpdateDefinition> for CatalogEntry {
    fn from(def: UpdateDefinition) -> Self {
        Self::Update(def)
    }
}

/// Result of classifying a single catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Operation(OperationDefinition),
    Skip,
}

/// Classifies a catalog entry. Total and side-effect free.
#[must_use]
pub fn classify(entry: &CatalogEntry) -> Classification {
    match entry {
        CatalogEntry::Process(d) => Classification::Operation(OperationDefinition::Process(d.clone())),
        CatalogEntry::Notification(d) => {
            Classification::Operation(OperationDefinition::Notification(d.clone()))
        }
        CatalogEntry::Read(d) => Classification::Operation(OperationDefinition::Read(d.clone())),
        CatalogEntry::Update(d) => Classification::Operation(OperationDefinition::Update(d.clone())),
        CatalogEntry::Unrelated(_) => Classification::Skip,
    }
}

/// Insertion-ordered mapping from catalog key to entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationCatalog {
    entries: Vec<(String, CatalogEntry)>,
}

impl OperationCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning the one previously stored under `key`.
    ///
    /// A replaced entry keeps its original position.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        entry: impl Into<CatalogEntry>,
    ) -> Option<CatalogEntry> {
        let key = key.into();
        let entry = entry.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, entry));
        }
        self.entries.push((key, entry));
        None
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, entry: impl Into<CatalogEntry>) -> Self {
        self.insert(key, entry);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Classified operations in catalog order; unrelated entries are dropped.
    pub fn operations(&self) -> impl Iterator<Item = (&str, OperationDefinition)> {
        self.iter().filter_map(|(key, entry)| match classify(entry) {
            Classification::Operation(def) => Some((key, def)),
            Classification::Skip => {
                tracing::debug!(key, "skipping catalog entry that is not an operation");
                None
            }
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a catalog from a JSON manifest object.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotAnObject` when the manifest root is not an object.
    pub fn from_manifest(manifest: &Value) -> Result<Self, CatalogError> {
        let object = manifest.as_object().ok_or(CatalogError::NotAnObject {
            found: json_type_name(manifest),
        })?;
        let entries = object
            .iter()
            .map(|(key, value)| (key.clone(), CatalogEntry::from_value(key, value)))
            .collect();
        Ok(Self { entries })
    }

    /// Parses and loads a JSON manifest.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Json` for malformed JSON and
    /// `CatalogError::NotAnObject` when the root is not an object.
    pub fn from_manifest_str(manifest: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(manifest)?;
        Self::from_manifest(&value)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::definition::OperationKind;

    #[test]
    fn classify_maps_each_variant() {
        let cases = [
            (CatalogEntry::from(ProcessDefinition::new("p")), Some(OperationKind::Process)),
            (CatalogEntry::from(NotificationDefinition::new("s")), Some(OperationKind::Notification)),
            (CatalogEntry::from(ReadDefinition::new("q")), Some(OperationKind::Read)),
            (CatalogEntry::from(UpdateDefinition::new("u")), Some(OperationKind::Update)),
            (CatalogEntry::Unrelated(json!(42)), None),
        ];
        for (entry, expected) in cases {
            let kind = match classify(&entry) {
                Classification::Operation(def) => Some(def.kind()),
                Classification::Skip => None,
            };
            assert_eq!(kind, expected, "entry {entry:?}");
        }
    }

    #[test]
    fn from_value_recognises_discriminants() {
        assert_eq!(
            CatalogEntry::from_value("k", &json!({"type": "signal", "name": "setDeadline"})),
            CatalogEntry::Notification(NotificationDefinition::new("setDeadline"))
        );
        assert_eq!(
            CatalogEntry::from_value("k", &json!({"type": "query", "name": "timeLeft"})),
            CatalogEntry::Read(ReadDefinition::new("timeLeft"))
        );
        assert_eq!(
            CatalogEntry::from_value("k", &json!({"type": "update", "name": "extend"})),
            CatalogEntry::Update(UpdateDefinition::new("extend"))
        );
    }

    #[test]
    fn from_value_process_defaults_name_to_key() {
        let entry = CatalogEntry::from_value("deadline", &json!({"type": "workflow"}));
        assert_eq!(entry, CatalogEntry::Process(ProcessDefinition::new("deadline")));

        let entry = CatalogEntry::from_value(
            "deadline",
            &json!({"type": "process", "name": "deadlineProcess", "completion": "await"}),
        );
        assert_eq!(
            entry,
            CatalogEntry::Process(ProcessDefinition::new("deadlineProcess").awaiting_completion())
        );
    }

    #[test]
    fn from_value_unknown_completion_falls_back_to_start() {
        let entry = CatalogEntry::from_value(
            "deadline",
            &json!({"type": "process", "completion": "awiat"}),
        );
        assert_eq!(entry, CatalogEntry::Process(ProcessDefinition::new("deadline")));

        let entry = CatalogEntry::from_value("deadline", &json!({"type": "process", "completion": null}));
        assert_eq!(entry, CatalogEntry::Process(ProcessDefinition::new("deadline")));
    }

    #[test]
    fn from_value_skips_unrecognised_shapes() {
        for value in [
            json!(null),
            json!("signal"),
            json!([1, 2]),
            json!({"type": "signal"}),
            json!({"type": "timer", "name": "t"}),
            json!({"name": "noType"}),
        ] {
            assert!(
                matches!(CatalogEntry::from_value("k", &value), CatalogEntry::Unrelated(_)),
                "value {value} should be unrelated"
            );
        }
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut catalog = OperationCatalog::new()
            .with("a", ReadDefinition::new("first"))
            .with("b", ReadDefinition::new("second"));
        let previous = catalog.insert("a", ReadDefinition::new("third"));

        assert_eq!(previous, Some(CatalogEntry::Read(ReadDefinition::new("first"))));
        let keys: Vec<_> = catalog.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn operations_skip_unrelated_entries() {
        let catalog = OperationCatalog::new()
            .with("order", ProcessDefinition::new("orderProcess"))
            .with("VERSION", CatalogEntry::Unrelated(json!("1.2.0")))
            .with("approve", NotificationDefinition::new("approve"));

        let ops: Vec<_> = catalog.operations().map(|(k, d)| (k, d.kind())).collect();
        assert_eq!(
            ops,
            vec![("order", OperationKind::Process), ("approve", OperationKind::Notification)]
        );
    }

    #[test]
    fn manifest_loads_and_classifies() {
        let catalog = OperationCatalog::from_manifest_str(
            r#"{
                "deadline": {"type": "workflow", "name": "deadlineProcess"},
                "setDeadlineSignal": {"type": "signal", "name": "setDeadline"},
                "helpers": {"retries": 3}
            }"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.operations().count(), 2);
        assert!(matches!(catalog.get("helpers"), Some(CatalogEntry::Unrelated(_))));
    }

    #[test]
    fn manifest_root_must_be_object() {
        let err = OperationCatalog::from_manifest_str("[1, 2]").unwrap_err();
        assert!(matches!(err, CatalogError::NotAnObject { found: "array" }));

        let err = OperationCatalog::from_manifest_str("{not json").unwrap_err();
        assert!(matches!(err, CatalogError::Json(_)));
    }
}
