use waypoint_core::CatalogError;

/// Errors raised while wiring a gateway. Request-time failures are
/// `DispatchError`s and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid path segment {segment:?} for {operation}: {reason}")]
    InvalidSegment {
        operation: String,
        segment: String,
        reason: &'static str,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
