//! Middleware for protecting authenticated routes.
//!
//! Two bearer lanes share the same extraction: `jwt_auth` accepts access
//! credentials and stores their [`AccessClaims`] in the request extensions,
//! `jwt_refresh_auth` accepts refresh credentials and stores the
//! [`RefreshToken`] they carry. Neither lane touches storage.

use crate::api::common::service_error_to_http;
use crate::errors::{ServiceError, ServiceResult};
use crate::utils::jwt::TokenAuth;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Extract the credential from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> ServiceResult<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(ServiceError::token_unauthorized)
}

/// Access credential middleware
pub async fn jwt_auth(
    State(token_auth): State<Arc<TokenAuth>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let claims = bearer_token(request.headers())
        .and_then(|token| token_auth.verify_access(token))
        .map_err(service_error_to_http)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Refresh credential middleware
pub async fn jwt_refresh_auth(
    State(token_auth): State<Arc<TokenAuth>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let refresh_token = bearer_token(request.headers())
        .and_then(|token| token_auth.verify_refresh(token))
        .map_err(service_error_to_http)?;

    request.extensions_mut().insert(refresh_token);
    Ok(next.run(request).await)
}
