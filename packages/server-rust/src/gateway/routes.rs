//! Route naming and the de-duplicating route table.

use std::collections::HashSet;
use std::fmt;

use axum::http::Method;
use axum::routing::MethodRouter;
use axum::Router;
use waypoint_core::OperationKind;

use super::error::GatewayError;

/// Path of the generator-owned cancellation route.
pub const CANCEL_PATH: &str = "/process/{id}";

#[must_use]
pub fn process_path(key: &str) -> String {
    format!("/process/{key}")
}

#[must_use]
pub fn process_with_id_path(key: &str) -> String {
    format!("/process/{key}/{{id}}")
}

#[must_use]
pub fn notify_path(name: &str) -> String {
    format!("/notify/{name}/{{id}}")
}

#[must_use]
pub fn read_path(name: &str) -> String {
    format!("/read/{name}/{{id}}")
}

#[must_use]
pub fn update_path(name: &str) -> String {
    format!("/update/{name}/{{id}}")
}

/// Checks that `segment` can be spliced into a route path as a literal.
///
/// # Errors
///
/// Returns `GatewayError::InvalidSegment` for empty segments, segments with
/// path or capture syntax, and segments starting with a wildcard marker.
pub fn validate_segment(operation: &str, segment: &str) -> Result<(), GatewayError> {
    let reason = if segment.is_empty() {
        Some("segment is empty")
    } else if segment.contains(['/', '{', '}', '?', '#']) {
        Some("segment contains reserved path characters")
    } else if segment.starts_with([':', '*']) {
        Some("segment starts with a wildcard marker")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(GatewayError::InvalidSegment {
            operation: operation.to_string(),
            segment: segment.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// What a registered route does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    Process,
    Notification,
    Read,
    Update,
    Cancel,
}

impl From<OperationKind> for RouteKind {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Process => Self::Process,
            OperationKind::Notification => Self::Notification,
            OperationKind::Read => Self::Read,
            OperationKind::Update => Self::Update,
        }
    }
}

/// A route the gateway actually registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub method: Method,
    pub path: String,
    pub kind: RouteKind,
    /// Catalog key for process routes, declared name otherwise; empty for cancel.
    pub operation: String,
}

impl fmt::Display for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Accumulates routes on a router, keeping the first handler per method+path.
pub(crate) struct RouteTable {
    router: Router,
    seen: HashSet<(Method, String)>,
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub(crate) fn new(router: Router) -> Self {
        Self {
            router,
            seen: HashSet::new(),
            routes: Vec::new(),
        }
    }

    /// Registers `handler` unless the method+path is already taken.
    ///
    /// Returns `false` when the route was skipped as a duplicate.
    pub(crate) fn register(&mut self, descriptor: RouteDescriptor, handler: MethodRouter) -> bool {
        let key = (descriptor.method.clone(), descriptor.path.clone());
        if !self.seen.insert(key) {
            tracing::warn!(
                route = %descriptor,
                operation = %descriptor.operation,
                "route already registered; keeping the first handler"
            );
            return false;
        }

        tracing::debug!(route = %descriptor, operation = %descriptor.operation, "registering route");
        let router = std::mem::take(&mut self.router);
        self.router = router.route(&descriptor.path, handler);
        self.routes.push(descriptor);
        true
    }

    pub(crate) fn finish(self) -> (Router, Vec<RouteDescriptor>) {
        (self.router, self.routes)
    }
}

#[cfg(test)]
mod tests {
    use axum::routing::get;

    use super::*;

    fn descriptor(method: Method, path: &str) -> RouteDescriptor {
        RouteDescriptor {
            method,
            path: path.to_string(),
            kind: RouteKind::Read,
            operation: "timeLeft".to_string(),
        }
    }

    #[test]
    fn paths_follow_naming_convention() {
        assert_eq!(process_path("order"), "/process/order");
        assert_eq!(process_with_id_path("order"), "/process/order/{id}");
        assert_eq!(notify_path("setDeadline"), "/notify/setDeadline/{id}");
        assert_eq!(read_path("timeLeft"), "/read/timeLeft/{id}");
        assert_eq!(update_path("extend"), "/update/extend/{id}");
    }

    #[test]
    fn validate_segment_accepts_plain_names() {
        for segment in ["order", "set-deadline", "time_left", "v2.extend"] {
            assert!(validate_segment("op", segment).is_ok(), "{segment}");
        }
    }

    #[test]
    fn validate_segment_rejects_path_syntax() {
        for segment in ["", "a/b", "{id}", "x?y", ":name", "*rest"] {
            let err = validate_segment("op", segment).unwrap_err();
            assert!(matches!(err, GatewayError::InvalidSegment { .. }), "{segment}");
        }
    }

    #[test]
    fn first_registration_wins() {
        let mut table = RouteTable::new(Router::new());
        assert!(table.register(descriptor(Method::GET, "/read/timeLeft/{id}"), get(|| async { "a" })));
        assert!(!table.register(descriptor(Method::GET, "/read/timeLeft/{id}"), get(|| async { "b" })));

        let (_router, routes) = table.finish();
        assert_eq!(routes.len(), 1);
    }

    #[test]
    fn same_path_different_method_is_allowed() {
        let mut table = RouteTable::new(Router::new());
        assert!(table.register(descriptor(Method::GET, "/x/{id}"), get(|| async { "a" })));
        assert!(table.register(
            descriptor(Method::DELETE, "/x/{id}"),
            axum::routing::delete(|| async { "b" })
        ));
        let (_router, routes) = table.finish();
        assert_eq!(routes.len(), 2);
    }
}
