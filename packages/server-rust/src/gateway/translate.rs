//! Response translation: the single place a `DispatchError` becomes an HTTP response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use waypoint_core::DispatchError;

/// JSON body of every error response produced by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<Value>>,
}

/// Maps an error to its HTTP status and body.
///
/// The error's `code` is used when `200 < code < 600`; anything else,
/// including a missing code, becomes 500.
#[must_use]
pub fn translate(err: &DispatchError) -> (StatusCode, ErrorBody) {
    let status = err
        .code
        .filter(|code| *code > 200 && *code < 600)
        .and_then(|code| u16::try_from(code).ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let body = ErrorBody {
        message: err.message.clone(),
        issues: err.issues.clone(),
    };
    (status, body)
}

/// Translates and renders an error response, logging the failure.
pub fn error_response(err: &DispatchError) -> Response {
    let (status, body) = translate(err);
    tracing::warn!(status = status.as_u16(), message = %err.message, "dispatch failed");
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn honours_not_found_code() {
        let (status, body) = translate(&DispatchError::not_found("no such process"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.message, "no such process");
        assert!(body.issues.is_none());
    }

    #[test]
    fn out_of_range_code_falls_back_to_500() {
        let (status, _) = translate(&DispatchError::new("weird").with_code(999));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn boundaries_are_exclusive() {
        for code in [200, 600, -1, 0] {
            let (status, _) = translate(&DispatchError::new("x").with_code(code));
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "code {code}");
        }
        let (status, _) = translate(&DispatchError::new("x").with_code(201));
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = translate(&DispatchError::new("x").with_code(599));
        assert_eq!(status.as_u16(), 599);
    }

    #[test]
    fn missing_code_is_500() {
        let (status, _) = translate(&DispatchError::new("boom"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn issues_are_serialized_only_when_present() {
        let (_, body) = translate(&DispatchError::new("plain"));
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"message": "plain"}));

        let issue = json!({"path": ["deadline"], "message": "Expected number"});
        let (status, body) = translate(
            &DispatchError::invalid_argument("invalid args").with_issues(vec![issue.clone()]),
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"message": "invalid args", "issues": [issue]})
        );
    }

    #[tokio::test]
    async fn error_response_renders_json() {
        let response = error_response(&DispatchError::conflict("already started"));
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"message": "already started"}));
    }

    proptest! {
        #[test]
        fn status_is_code_or_500(code in proptest::option::of(-1000i64..2000)) {
            let mut err = DispatchError::new("e");
            err.code = code;
            let (status, _) = translate(&err);
            match code {
                Some(c) if c > 200 && c < 600 => prop_assert_eq!(i64::from(status.as_u16()), c),
                _ => prop_assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR),
            }
        }
    }
}
