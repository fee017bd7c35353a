//! Shared building blocks for the HTTP API.
//!
//! Authentication routes live in `auth`; this module assembles them with
//! `/ping` behind the request-id, tracing, timeout and panic layers, and holds
//! the response envelope and error mapping they share.

pub mod common;

use crate::auth::routes::auth_router;
use crate::auth::service::AuthService;
use axum::{
    Router,
    body::Body,
    http::{HeaderName, Method, Request, header},
    routing::get,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{Span, debug_span};

/// Builds the application router.
///
/// Every request gets an `x-request-id` (kept when the client sent one),
/// echoed on the response and recorded on its trace span.
pub fn router(
    auth_service: Arc<AuthService>,
    request_timeout: Duration,
    enable_cors: bool,
) -> Router {
    let router = Router::new()
        .route("/ping", get(ping))
        .nest("/auth", auth_router(auth_service))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CatchPanicLayer::new()),
        );

    if enable_cors { router.layer(cors()) } else { router }
}

async fn ping() -> &'static str {
    "pong"
}

// Browsers reject credentials alongside a wildcard origin, so none are allowed.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([header::LINK])
        .max_age(Duration::from_secs(86400))
}

fn make_span(request: &Request<Body>) -> Span {
    let method = request.method();
    let path = request.uri().path();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", %method, path, request_id)
}
