//! Deadline-tracking demo process, served by the `waypoint-demo` binary.
//!
//! Catalog:
//! - `deadline` / `deadlineAndWait`: the `deadlineProcess`, started or executed
//! - `setDeadline` (notification, validated): move the deadline
//! - `timeLeft` (read): milliseconds until the deadline, never negative
//! - `extendDeadline` (update): push the deadline back, returns the new one

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use waypoint_core::{
    CatalogEntry, DispatchError, NotificationDefinition, OperationCatalog, ProcessDefinition,
    ReadDefinition, UpdateDefinition,
};

use crate::backend::{MemoryBackend, ProcessLogic};

pub const PROCESS_NAME: &str = "deadlineProcess";
pub const DEFAULT_DEADLINE_MS: i64 = 60_000;

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or(0)
}

#[must_use]
pub fn set_deadline() -> NotificationDefinition {
    NotificationDefinition::new("setDeadline")
}

#[must_use]
pub fn time_left() -> ReadDefinition {
    ReadDefinition::new("timeLeft")
}

#[must_use]
pub fn extend_deadline() -> UpdateDefinition {
    UpdateDefinition::new("extendDeadline")
}

/// The demo catalog. Keys deliberately differ from declared names.
#[must_use]
pub fn catalog() -> OperationCatalog {
    OperationCatalog::new()
        .with("deadline", ProcessDefinition::new(PROCESS_NAME))
        .with(
            "deadlineAndWait",
            ProcessDefinition::new(PROCESS_NAME).awaiting_completion(),
        )
        .with("setDeadlineSignal", set_deadline())
        .with("timeLeftQuery", time_left())
        .with("extendDeadlineUpdate", extend_deadline())
        .with("DEFAULT_DEADLINE_MS", CatalogEntry::Unrelated(json!(DEFAULT_DEADLINE_MS)))
}

/// In-memory backend with `deadlineProcess` registered.
#[must_use]
pub fn backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.register_process(PROCESS_NAME, DeadlineProcess::from_args);
    backend
}

/// Validator for `setDeadline`: accepts a numeric or numeric-string
/// `deadline` and forwards it normalised to an integer.
///
/// # Errors
///
/// Returns a 400 with a per-field issue when `deadline` is missing,
/// negative, or not an integer.
pub fn validate_deadline(payload: Value) -> Result<Value, DispatchError> {
    let deadline = match payload.get("deadline") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match deadline {
        Some(deadline) if deadline >= 0 => Ok(json!({ "deadline": deadline })),
        _ => Err(deadline_issue("invalid setDeadline payload")),
    }
}

fn deadline_issue(message: &str) -> DispatchError {
    DispatchError::invalid_argument(message).with_issues(vec![json!({
        "path": ["deadline"],
        "message": "expected a non-negative integer timestamp in milliseconds",
    })])
}

/// State of one deadline instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineProcess {
    deadline_ms: i64,
}

impl DeadlineProcess {
    /// Creates an instance from start arguments; `deadline` defaults to one
    /// minute from now.
    ///
    /// # Errors
    ///
    /// Returns a 400 when `deadline` is present but not a non-negative integer.
    pub fn from_args(args: &Value) -> Result<Self, DispatchError> {
        let deadline_ms = match args.get("deadline") {
            None | Some(Value::Null) => now_ms().saturating_add(DEFAULT_DEADLINE_MS),
            Some(value) => value
                .as_i64()
                .filter(|deadline| *deadline >= 0)
                .ok_or_else(|| deadline_issue("deadline must be a non-negative integer"))?,
        };
        Ok(Self { deadline_ms })
    }

    fn remaining_ms(&self) -> i64 {
        self.deadline_ms.saturating_sub(now_ms()).max(0)
    }
}

impl ProcessLogic for DeadlineProcess {
    fn on_signal(&mut self, signal: &str, payload: Value) -> Result<(), DispatchError> {
        match signal {
            "setDeadline" => {
                self.deadline_ms = payload
                    .get("deadline")
                    .and_then(Value::as_i64)
                    .filter(|deadline| *deadline >= 0)
                    .ok_or_else(|| deadline_issue("deadline must be a non-negative integer"))?;
                Ok(())
            }
            other => Err(DispatchError::invalid_argument(format!("unknown signal {other}"))),
        }
    }

    fn on_query(&self, query: &str, _params: &Value) -> Result<Value, DispatchError> {
        match query {
            "timeLeft" => Ok(json!(self.remaining_ms())),
            "deadline" => Ok(json!(self.deadline_ms)),
            other => Err(DispatchError::invalid_argument(format!("unknown query {other}"))),
        }
    }

    fn on_update(&mut self, update: &str, payload: Value) -> Result<Value, DispatchError> {
        match update {
            "extendDeadline" => {
                let by_ms = payload
                    .get("byMs")
                    .and_then(Value::as_i64)
                    .filter(|by| *by > 0)
                    .ok_or_else(|| by_ms_issue("byMs must be a positive integer"))?;
                self.deadline_ms = self
                    .deadline_ms
                    .checked_add(by_ms)
                    .ok_or_else(|| by_ms_issue("byMs pushes the deadline out of range"))?;
                Ok(json!({ "deadline": self.deadline_ms }))
            }
            other => Err(DispatchError::invalid_argument(format!("unknown update {other}"))),
        }
    }

    fn output(&self) -> Value {
        json!({ "deadline": self.deadline_ms })
    }
}

fn by_ms_issue(message: &str) -> DispatchError {
    DispatchError::invalid_argument(message)
        .with_issues(vec![json!({"path": ["byMs"], "message": "expected positive integer"})])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_normalises_numeric_strings() {
        let out = validate_deadline(json!({"deadline": " 1700000000000 "})).unwrap();
        assert_eq!(out, json!({"deadline": 1_700_000_000_000_i64}));
    }

    #[test]
    fn validator_drops_unknown_fields() {
        let out = validate_deadline(json!({"deadline": 5, "extra": true})).unwrap();
        assert_eq!(out, json!({"deadline": 5}));
    }

    #[test]
    fn validator_rejects_bad_deadlines_with_issues() {
        for payload in [json!({}), json!({"deadline": -1}), json!({"deadline": "soon"})] {
            let err = validate_deadline(payload).unwrap_err();
            assert_eq!(err.code, Some(400));
            assert_eq!(err.issues.as_ref().map(Vec::len), Some(1));
        }
    }

    #[test]
    fn from_args_defaults_deadline() {
        let before = now_ms();
        let process = DeadlineProcess::from_args(&json!({})).unwrap();
        assert!(process.deadline_ms >= before + DEFAULT_DEADLINE_MS);
        assert!(DeadlineProcess::from_args(&json!({"deadline": "x"})).is_err());
    }

    #[test]
    fn time_left_never_negative() {
        let process = DeadlineProcess { deadline_ms: 0 };
        assert_eq!(process.on_query("timeLeft", &json!({})).unwrap(), json!(0));
    }

    #[test]
    fn extend_moves_deadline() {
        let mut process = DeadlineProcess { deadline_ms: 1_000 };
        let out = process.on_update("extendDeadline", json!({"byMs": 500})).unwrap();
        assert_eq!(out, json!({"deadline": 1_500}));
        assert!(process.on_update("extendDeadline", json!({"byMs": 0})).is_err());
    }

    #[test]
    fn catalog_contains_unrelated_helper() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.operations().count(), 5);
    }

    #[test]
    fn from_args_rejects_negative_deadline() {
        let err = DeadlineProcess::from_args(&json!({"deadline": i64::MIN})).unwrap_err();
        assert_eq!(err.code, Some(400));
        assert_eq!(err.issues.unwrap()[0]["path"], json!(["deadline"]));
    }

    #[test]
    fn time_left_saturates_on_far_deadlines() {
        let process = DeadlineProcess { deadline_ms: i64::MAX };
        assert!(process.on_query("timeLeft", &json!({})).unwrap().as_i64().unwrap() > 0);
    }

    #[test]
    fn extend_overflow_is_rejected() {
        let mut process = DeadlineProcess { deadline_ms: 1_000 };
        let err = process
            .on_update("extendDeadline", json!({"byMs": i64::MAX}))
            .unwrap_err();
        assert_eq!(err.code, Some(400));
        assert_eq!(err.issues.unwrap()[0]["path"], json!(["byMs"]));
        assert_eq!(process.deadline_ms, 1_000);
    }
}
