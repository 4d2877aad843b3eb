//! Per-route dispatch: extract the request, call the backend, translate the outcome.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::rejection::{BytesRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde_json::{json, Map, Value};
use tracing::{info_span, Instrument};
use waypoint_core::{
    new_instance_id, CompletionPolicy, Connection, DispatchError, NotificationDefinition,
    ProcessDefinition, ReadDefinition, StartOptions, UpdateDefinition, ValidatorRegistry,
};

use super::translate::error_response;

/// State shared by every route of one gateway.
pub(crate) struct DispatchContext {
    pub connection: Arc<dyn Connection>,
    pub queue: String,
    pub validators: ValidatorRegistry,
    pub timeout: Option<Duration>,
}

impl DispatchContext {
    /// Runs one backend call inside a `dispatch` span, bounded by the timeout budget.
    async fn run<T, F>(
        &self,
        kind: &'static str,
        operation: &str,
        instance_id: &str,
        call: F,
    ) -> Result<T, DispatchError>
    where
        F: Future<Output = Result<T, DispatchError>>,
    {
        let span = info_span!(
            "dispatch",
            kind,
            operation,
            instance_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        async move {
            let start = Instant::now();
            let result = match self.timeout {
                Some(budget) => tokio::time::timeout(budget, call)
                    .await
                    .unwrap_or_else(|_elapsed| Err(DispatchError::timeout(millis(budget)))),
                None => call.await,
            };

            let duration_ms = millis(start.elapsed());
            let outcome = if result.is_ok() { "ok" } else { "error" };
            tracing::Span::current().record("duration_ms", duration_ms);
            tracing::Span::current().record("outcome", outcome);
            tracing::info!(duration_ms, outcome, "dispatch complete");
            result
        }
        .instrument(span)
        .await
    }

    /// Applies the registered transform, if any; its output replaces the payload.
    fn validate(
        &self,
        definition: &NotificationDefinition,
        payload: Value,
    ) -> Result<Value, DispatchError> {
        match self.validators.lookup(definition) {
            Some(transform) => {
                tracing::debug!(notification = %definition.name, "applying validator");
                transform(payload)
            }
            None => Ok(payload),
        }
    }
}

/// A definition bound to the gateway state; captured by each route closure.
#[derive(Clone)]
pub(crate) struct Bound<D> {
    pub ctx: Arc<DispatchContext>,
    /// Catalog key the definition was registered under.
    pub key: Arc<str>,
    pub definition: Arc<D>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /process/{key}` and `POST /process/{key}/{id}`.
pub(crate) async fn start_process(
    bound: Bound<ProcessDefinition>,
    path: Option<Result<Path<String>, PathRejection>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let path_id = match path.map(path_id).transpose() {
        Ok(id) => id,
        Err(err) => return error_response(&err),
    };
    let args = match read_body(body) {
        Ok(args) => args,
        Err(err) => return error_response(&err),
    };

    let instance_id = path_id
        .or_else(|| body_process_id(&args))
        .unwrap_or_else(|| new_instance_id(&bound.key));
    let options = StartOptions {
        queue: bound.ctx.queue.clone(),
        instance_id: instance_id.clone(),
        args,
    };
    let ctx = &bound.ctx;
    let definition = bound.definition.as_ref();

    match definition.completion {
        CompletionPolicy::Start => {
            let outcome = ctx
                .run("process", &bound.key, &instance_id, ctx.connection.start(definition, options))
                .await;
            respond(outcome, |process_id| {
                (StatusCode::CREATED, Json(json!({ "processId": process_id }))).into_response()
            })
        }
        CompletionPolicy::AwaitCompletion => {
            let outcome = ctx
                .run("process", &bound.key, &instance_id, ctx.connection.execute(definition, options))
                .await;
            respond(outcome, |result| {
                (
                    StatusCode::OK,
                    Json(json!({ "processId": instance_id, "result": result })),
                )
                    .into_response()
            })
        }
    }
}

/// `PUT /notify/{name}/{id}`.
pub(crate) async fn notify(
    bound: Bound<NotificationDefinition>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let instance_id = match path_id(path) {
        Ok(id) => id,
        Err(err) => return error_response(&err),
    };
    let definition = bound.definition.as_ref();
    let payload = match read_body(body).and_then(|p| bound.ctx.validate(definition, p)) {
        Ok(payload) => payload,
        Err(err) => return error_response(&err),
    };

    let handle = bound.ctx.connection.handle(&instance_id);
    let outcome = bound
        .ctx
        .run("notification", &definition.name, &instance_id, handle.signal(definition, payload))
        .await;
    respond(outcome, |()| {
        (StatusCode::OK, Json(json!({ "received": true }))).into_response()
    })
}

/// `GET /read/{name}/{id}`; the query string becomes the read parameters.
pub(crate) async fn read(
    bound: Bound<ReadDefinition>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Response {
    let instance_id = match path_id(path) {
        Ok(id) => id,
        Err(err) => return error_response(&err),
    };
    let params = match query {
        Ok(Query(params)) => Value::Object(
            params
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect::<Map<String, Value>>(),
        ),
        Err(rejection) => {
            return error_response(&DispatchError::invalid_argument(rejection.body_text()))
        }
    };

    let definition = bound.definition.as_ref();
    let handle = bound.ctx.connection.handle(&instance_id);
    let outcome = bound
        .ctx
        .run("read", &definition.name, &instance_id, handle.query(definition, params))
        .await;
    respond(outcome, |result| {
        (StatusCode::OK, Json(json!({ "result": result }))).into_response()
    })
}

/// `PATCH /update/{name}/{id}`; responds with the backend result as-is.
pub(crate) async fn update(
    bound: Bound<UpdateDefinition>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let instance_id = match path_id(path) {
        Ok(id) => id,
        Err(err) => return error_response(&err),
    };
    let payload = match read_body(body) {
        Ok(payload) => payload,
        Err(err) => return error_response(&err),
    };

    let definition = bound.definition.as_ref();
    let handle = bound.ctx.connection.handle(&instance_id);
    let outcome = bound
        .ctx
        .run("update", &definition.name, &instance_id, handle.execute_update(definition, payload))
        .await;
    respond(outcome, |result| (StatusCode::OK, Json(result)).into_response())
}

/// `DELETE /process/{id}`.
pub(crate) async fn cancel(
    ctx: Arc<DispatchContext>,
    path: Result<Path<String>, PathRejection>,
) -> Response {
    let instance_id = match path_id(path) {
        Ok(id) => id,
        Err(err) => return error_response(&err),
    };

    let handle = ctx.connection.handle(&instance_id);
    let outcome = ctx.run("cancel", "", &instance_id, handle.cancel()).await;
    respond(outcome, |()| StatusCode::NO_CONTENT.into_response())
}

/// Fallback for paths no route matches.
pub(crate) async fn route_not_found(method: Method, uri: Uri) -> Response {
    error_response(&DispatchError::not_found(format!("no route for {method} {}", uri.path())))
}

/// Fallback for a known path hit with a method it does not serve.
pub(crate) async fn method_not_allowed(method: Method, uri: Uri) -> Response {
    error_response(
        &DispatchError::new(format!("method {method} not allowed for {}", uri.path())).with_code(405),
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn respond<T>(outcome: Result<T, DispatchError>, ok: impl FnOnce(T) -> Response) -> Response {
    match outcome {
        Ok(value) => ok(value),
        Err(err) => error_response(&err),
    }
}

fn path_id(path: Result<Path<String>, PathRejection>) -> Result<String, DispatchError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| DispatchError::invalid_argument(rejection.body_text()))
}

/// Buffering failures keep the status axum chose for them (413 for oversize bodies).
fn read_body(body: Result<Bytes, BytesRejection>) -> Result<Value, DispatchError> {
    let bytes = body.map_err(|rejection| {
        DispatchError::new(rejection.body_text()).with_code(i64::from(rejection.status().as_u16()))
    })?;
    parse_body(&bytes)
}

/// An empty body is an empty object.
fn parse_body(body: &Bytes) -> Result<Value, DispatchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body)
        .map_err(|e| DispatchError::invalid_argument(format!("invalid JSON body: {e}")))
}

fn body_process_id(args: &Value) -> Option<String> {
    args.get("processId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_empty_object() {
        assert_eq!(parse_body(&Bytes::new()).unwrap(), json!({}));
        assert_eq!(parse_body(&Bytes::from_static(b" \n")).unwrap(), json!({}));
    }

    #[test]
    fn malformed_body_is_invalid_argument() {
        let err = parse_body(&Bytes::from_static(b"{oops")).unwrap_err();
        assert_eq!(err.code, Some(400));
        assert!(err.message.starts_with("invalid JSON body"));
    }

    #[test]
    fn body_process_id_requires_non_empty_string() {
        assert_eq!(body_process_id(&json!({"processId": "abc"})), Some("abc".to_string()));
        assert_eq!(body_process_id(&json!({"processId": ""})), None);
        assert_eq!(body_process_id(&json!({"processId": 7})), None);
        assert_eq!(body_process_id(&json!([1])), None);
    }
}
