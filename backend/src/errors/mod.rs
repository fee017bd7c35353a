//! Global application error types.
//!
//! This module defines the error type shared by the repositories, the token
//! authority and the auth orchestrator, and the fixed messages returned to
//! callers on authentication failures.

use thiserror::Error;

/// Login identifier or credential did not resolve to an account.
pub const ERR_UNKNOWN_LOGIN: &str = "unknown login";
/// The account exists but is not allowed to log in.
pub const ERR_LOGIN_DISABLED: &str = "login disabled";
/// The refresh credential is expired, rotated away or deleted.
pub const ERR_TOKEN_EXPIRED: &str = "token expired";
/// Any other credential verification failure.
pub const ERR_TOKEN_UNAUTHORIZED: &str = "token unauthorized";

/// Generic service error that can be used across all entities
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Database error: {source}")]
    Database {
        #[from]
        source: anyhow::Error,
    },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    // Helper constructors for common patterns

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn unknown_login() -> Self {
        Self::unauthorized(ERR_UNKNOWN_LOGIN)
    }

    pub fn login_disabled() -> Self {
        Self::unauthorized(ERR_LOGIN_DISABLED)
    }

    pub fn token_expired() -> Self {
        Self::unauthorized(ERR_TOKEN_EXPIRED)
    }

    pub fn token_unauthorized() -> Self {
        Self::unauthorized(ERR_TOKEN_UNAUTHORIZED)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

}

#[cfg(test)]
impl ServiceError {
    /// Message carried by an `Unauthorized` error, if this is one.
    pub fn unauthorized_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message } => Some(message),
            _ => None,
        }
    }
}
