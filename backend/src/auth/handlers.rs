//! Handler functions for authentication-related API endpoints.
//!
//! These functions parse incoming HTTP requests for login, refresh and logout
//! and delegate to `auth::service` for the core logic. Refresh and logout run
//! behind the refresh lane, which has already produced the [`RefreshToken`].

use crate::api::common::service_error_to_http;
use crate::auth::models::*;
use crate::auth::service::AuthService;
use crate::errors::ServiceError;
use crate::utils::jwt::{AccessClaims, RefreshToken};
use axum::{
    extract::{Extension, Json, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::USER_AGENT},
    response::Json as ResponseJson,
};
use std::sync::Arc;

/// Handle login request
#[axum::debug_handler]
pub async fn login(
    Extension(auth_service): Extension<Arc<AuthService>>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ResponseJson<TokenResponse>, (StatusCode, String)> {
    let Json(payload) = payload.map_err(|rejection| {
        service_error_to_http(ServiceError::validation(rejection.body_text()))
    })?;

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match auth_service.login(payload, user_agent).await {
        Ok(response) => Ok(ResponseJson(response)),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle token refresh request
#[axum::debug_handler]
pub async fn refresh_token(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Extension(refresh_token): Extension<RefreshToken>,
) -> Result<ResponseJson<TokenResponse>, (StatusCode, String)> {
    match auth_service.refresh(&refresh_token).await {
        Ok(response) => Ok(ResponseJson(response)),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle logout request, revoking the presented refresh credential
#[axum::debug_handler]
pub async fn logout(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Extension(refresh_token): Extension<RefreshToken>,
) -> Result<StatusCode, (StatusCode, String)> {
    auth_service
        .logout(&refresh_token)
        .await
        .map_err(service_error_to_http)?;

    Ok(StatusCode::OK)
}

/// Get current account information from the access credential
#[axum::debug_handler]
pub async fn me(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<ResponseJson<AccountInfo>, (StatusCode, String)> {
    match auth_service.profile(&claims).await {
        Ok(account) => Ok(ResponseJson(account)),
        Err(error) => Err(service_error_to_http(error)),
    }
}
