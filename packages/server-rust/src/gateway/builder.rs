//! Gateway generation: turns an `OperationCatalog` into an axum `Router`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::{BytesRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::http::Method;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use bytes::Bytes;
use serde_json::Value;
use waypoint_core::{
    Connection, DispatchError, NotificationDefinition, OperationCatalog, OperationDefinition,
    ProcessDefinition, ReadDefinition, UpdateDefinition, ValidatorRegistry,
};

use super::config::GatewayConfig;
use super::dispatch::{self, Bound, DispatchContext};
use super::error::GatewayError;
use super::routes::{
    self, validate_segment, RouteDescriptor, RouteKind, RouteTable, CANCEL_PATH,
};

/// A generated gateway: the populated router plus a report of its routes.
pub struct Gateway {
    router: Router,
    routes: Vec<RouteDescriptor>,
}

impl Gateway {
    /// Routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Hands the router to the host HTTP server.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Wires a catalog onto a router.
///
/// Validators are attached here, during wiring; once [`build`](Self::build)
/// runs they are frozen alongside the router and cannot change while serving.
pub struct GatewayBuilder {
    connection: Arc<dyn Connection>,
    config: GatewayConfig,
    validators: ValidatorRegistry,
    router: Option<Router>,
}

impl GatewayBuilder {
    #[must_use]
    pub fn new(connection: Arc<dyn Connection>, config: GatewayConfig) -> Self {
        Self {
            connection,
            config,
            validators: ValidatorRegistry::new(),
            router: None,
        }
    }

    /// Registers routes onto `router` instead of a fresh one.
    ///
    /// The existing router must not already own any of the generated
    /// method+path pairs; axum rejects overlapping registrations. Its own
    /// fallback is left alone, so unmatched paths answer however the host
    /// decided; a gateway-owned router answers them with a translated 404.
    #[must_use]
    pub fn with_router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Attaches a pre-dispatch transform to a notification definition,
    /// replacing any earlier one for the same definition.
    pub fn attach_validator<F>(&mut self, definition: &NotificationDefinition, transform: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value, DispatchError> + Send + Sync + 'static,
    {
        self.validators.register(definition, transform);
        self
    }

    /// Builder-style [`attach_validator`](Self::attach_validator).
    #[must_use]
    pub fn with_validator<F>(mut self, definition: &NotificationDefinition, transform: F) -> Self
    where
        F: Fn(Value) -> Result<Value, DispatchError> + Send + Sync + 'static,
    {
        self.validators.register(definition, transform);
        self
    }

    /// Generates one route family per classified catalog entry plus the
    /// global cancellation route.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidSegment` when a catalog key (for
    /// processes) or a declared name cannot be used as a path segment.
    pub fn build(self, catalog: &OperationCatalog) -> Result<Gateway, GatewayError> {
        let ctx = Arc::new(DispatchContext {
            connection: self.connection,
            queue: self.config.queue,
            validators: self.validators,
            timeout: self.config.dispatch_timeout,
        });
        let owns_router = self.router.is_none();
        let mut table = RouteTable::new(self.router.unwrap_or_default());

        for (key, definition) in catalog.operations() {
            match definition {
                OperationDefinition::Process(def) => {
                    validate_segment(key, key)?;
                    register_process(&mut table, bind(&ctx, key, def));
                }
                OperationDefinition::Notification(def) => {
                    validate_segment(key, &def.name)?;
                    register_notification(&mut table, bind(&ctx, key, def));
                }
                OperationDefinition::Read(def) => {
                    validate_segment(key, &def.name)?;
                    register_read(&mut table, bind(&ctx, key, def));
                }
                OperationDefinition::Update(def) => {
                    validate_segment(key, &def.name)?;
                    register_update(&mut table, bind(&ctx, key, def));
                }
            }
        }
        register_cancel(&mut table, &ctx);

        let (router, routes) = table.finish();
        let router = router.method_not_allowed_fallback(dispatch::method_not_allowed);
        let router = if owns_router {
            router.fallback(dispatch::route_not_found)
        } else {
            router
        };
        tracing::info!(routes = routes.len(), queue = %ctx.queue, "gateway built");
        Ok(Gateway { router, routes })
    }
}

/// Builds a gateway without validators.
///
/// # Errors
///
/// See [`GatewayBuilder::build`].
pub fn build_gateway(
    catalog: &OperationCatalog,
    connection: Arc<dyn Connection>,
    config: GatewayConfig,
    existing: Option<Router>,
) -> Result<Gateway, GatewayError> {
    let mut builder = GatewayBuilder::new(connection, config);
    if let Some(router) = existing {
        builder = builder.with_router(router);
    }
    builder.build(catalog)
}

// ---------------------------------------------------------------------------
// Route synthesis
// ---------------------------------------------------------------------------

fn bind<D>(ctx: &Arc<DispatchContext>, key: &str, definition: D) -> Bound<D> {
    Bound {
        ctx: Arc::clone(ctx),
        key: Arc::from(key),
        definition: Arc::new(definition),
    }
}

fn descriptor(method: Method, path: String, kind: RouteKind, operation: &str) -> RouteDescriptor {
    RouteDescriptor {
        method,
        path,
        kind,
        operation: operation.to_string(),
    }
}

fn register_process(table: &mut RouteTable, bound: Bound<ProcessDefinition>) {
    let key = bound.key.to_string();

    let without_id = {
        let bound = bound.clone();
        move |body: Result<Bytes, BytesRejection>| dispatch::start_process(bound, None, body)
    };
    table.register(
        descriptor(Method::POST, routes::process_path(&key), RouteKind::Process, &key),
        post(without_id),
    );

    let with_id = move |path: Result<Path<String>, PathRejection>,
                        body: Result<Bytes, BytesRejection>| {
        dispatch::start_process(bound, Some(path), body)
    };
    table.register(
        descriptor(Method::POST, routes::process_with_id_path(&key), RouteKind::Process, &key),
        post(with_id),
    );
}

fn register_notification(table: &mut RouteTable, bound: Bound<NotificationDefinition>) {
    let name = bound.definition.name.clone();
    let handler = move |path: Result<Path<String>, PathRejection>,
                        body: Result<Bytes, BytesRejection>| {
        dispatch::notify(bound, path, body)
    };
    table.register(
        descriptor(Method::PUT, routes::notify_path(&name), RouteKind::Notification, &name),
        put(handler),
    );
}

fn register_read(table: &mut RouteTable, bound: Bound<ReadDefinition>) {
    let name = bound.definition.name.clone();
    let handler = move |path: Result<Path<String>, PathRejection>,
                        query: Result<Query<HashMap<String, String>>, QueryRejection>| {
        dispatch::read(bound, path, query)
    };
    table.register(
        descriptor(Method::GET, routes::read_path(&name), RouteKind::Read, &name),
        get(handler),
    );
}

fn register_update(table: &mut RouteTable, bound: Bound<UpdateDefinition>) {
    let name = bound.definition.name.clone();
    let handler = move |path: Result<Path<String>, PathRejection>,
                        body: Result<Bytes, BytesRejection>| {
        dispatch::update(bound, path, body)
    };
    table.register(
        descriptor(Method::PATCH, routes::update_path(&name), RouteKind::Update, &name),
        patch(handler),
    );
}

fn register_cancel(table: &mut RouteTable, ctx: &Arc<DispatchContext>) {
    let ctx = Arc::clone(ctx);
    let handler = move |path: Result<Path<String>, PathRejection>| dispatch::cancel(ctx, path);
    table.register(
        descriptor(Method::DELETE, CANCEL_PATH.to_string(), RouteKind::Cancel, ""),
        delete(handler),
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
