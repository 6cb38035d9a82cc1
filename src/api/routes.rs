//! API route configuration

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info_span;
use uuid::Uuid;

use crate::middleware::{require_bearer, AuthGate};

use super::handlers::{self, AppState};

/// Build the complete API router with middleware
pub fn build_router(app_state: AppState, auth_gate: Arc<AuthGate>, max_body_bytes: usize) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/", get(handlers::health))
        .with_state(app_state.clone());

    // Protected routes: auth wraps the body limit, so it is checked first
    let api_routes = Router::new()
        .route("/embed-text", post(handlers::embed_text))
        .route("/embed-image", post(handlers::embed_image))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .route_layer(axum::middleware::from_fn_with_state(auth_gate, require_bearer))
        .with_state(app_state);

    public_routes.merge(api_routes).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http().make_span_with(
            |req: &Request<Body>| {
                info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %req.method(),
                    path = %req.uri().path(),
                )
            },
        )),
    )
}
