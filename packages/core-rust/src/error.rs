//! Error types shared by the backend traits and the catalog loader.

use serde_json::Value;

/// A failed dispatch: raised by the backend, a validator, or the gateway itself.
///
/// `code` is a suggested HTTP status; the gateway only honours it when it falls
/// strictly between 200 and 600. `issues` carries structured per-field detail
/// (for example an argument validation failure) and is passed through to the
/// client untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct DispatchError {
    pub message: String,
    pub code: Option<i64>,
    pub issues: Option<Vec<Value>>,
}

impl DispatchError {
    /// An error with a message and no status hint.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            issues: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    #[must_use]
    pub fn with_issues(mut self, issues: Vec<Value>) -> Self {
        self.issues = Some(issues);
        self
    }

    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(message).with_code(400)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message).with_code(404)
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(message).with_code(409)
    }

    /// The backend did not answer within the dispatch budget.
    #[must_use]
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::new(format!("operation timed out after {timeout_ms}ms")).with_code(504)
    }
}

/// Errors from loading an operation catalog manifest.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog manifest is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog manifest must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}
