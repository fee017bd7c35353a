//! Defines the HTTP routes specifically for authentication.
//!
//! These routes handle login, token refresh, logout and the profile of the
//! authenticated account. They are designed to be nested into the main Axum
//! router.

use crate::auth::handlers::*;
use crate::auth::middleware::*;
use crate::auth::service::AuthService;
use axum::{
    Extension, Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

/// Creates the authentication router with all auth-related routes
pub fn auth_router(auth_service: Arc<AuthService>) -> Router {
    let token_auth = auth_service.token_auth();

    Router::new()
        .route("/login", post(login))
        .route(
            "/refresh",
            post(refresh_token).layer(middleware::from_fn_with_state(
                token_auth.clone(),
                jwt_refresh_auth,
            )),
        )
        .route(
            "/logout",
            post(logout).layer(middleware::from_fn_with_state(
                token_auth.clone(),
                jwt_refresh_auth,
            )),
        )
        .route(
            "/me",
            get(me).layer(middleware::from_fn_with_state(token_auth, jwt_auth)),
        )
        .layer(Extension(auth_service))
}
