//! HTTP middleware stack wrapped around the generated gateway router.
//!
//! Ordering follows the outer-to-inner convention: the first layer listed is
//! the outermost (sees the request first and the response last).

use axum::body::HttpBody;
use axum::http::header::{HeaderName, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::middleware::map_response;
use axum::response::Response;
use axum::Router;
use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use waypoint_core::DispatchError;

use super::config::NetworkConfig;
use crate::gateway::error_response;

/// The composed layer type produced by [`build_http_layers`].
type HttpLayers = Stack<
    PropagateRequestIdLayer,
    Stack<
        TimeoutLayer,
        Stack<
            CorsLayer,
            Stack<
                TraceLayer<SharedClassifier<ServerErrorsAsFailures>>,
                Stack<SetRequestIdLayer<MakeRequestUuid>, Identity>,
            >,
        >,
    >,
>;

/// Methods the generated routes use.
const GATEWAY_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// Builds the HTTP-level middleware stack.
///
/// **Ordering (outermost to innermost):**
/// 1. `SetRequestId` -- assigns a UUID v4 `X-Request-Id`
/// 2. `Tracing` -- request/response trace spans
/// 3. `CORS` -- allowed origins from config, all gateway methods
/// 4. `Timeout` -- 504 when a request outlives `request_timeout`
/// 5. `PropagateRequestId` -- echoes `X-Request-Id` on the response
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            config.request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

/// Wraps `router` in [`build_http_layers`] and gives the request timeout's
/// bare 504 the same JSON error body as every other gateway error.
pub fn with_http_layers(router: Router, config: &NetworkConfig) -> Router {
    let timeout_ms = u64::try_from(config.request_timeout.as_millis()).unwrap_or(u64::MAX);

    router
        .layer(build_http_layers(config))
        .layer(map_response(move |response: Response| async move {
            translate_request_timeout(response, timeout_ms)
        }))
}

/// Only the empty 504 is rewritten; dispatch timeouts already carry a body.
fn translate_request_timeout(response: Response, timeout_ms: u64) -> Response {
    if response.status() != StatusCode::GATEWAY_TIMEOUT
        || response.body().size_hint().exact() != Some(0)
    {
        return response;
    }

    let (parts, _) = response.into_parts();
    let mut translated = error_response(&DispatchError::timeout(timeout_ms));
    for (name, value) in &parts.headers {
        if name != CONTENT_LENGTH && name != CONTENT_TYPE {
            translated.headers_mut().append(name.clone(), value.clone());
        }
    }
    translated
}

/// `"*"` allows any origin; otherwise each parseable origin is allow-listed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| o.parse().ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(GATEWAY_METHODS)
        .allow_headers(Any)
}
