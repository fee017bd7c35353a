//! Rust structs that represent database table mappings.
//!
//! These models define the structure of data as it is stored in and retrieved
//! from the database. Note that these may differ from API-specific models.

use crate::utils::jwt::{AccessClaims, RefreshClaims};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: String,
    pub login: String,
    /// Credential material, opaque to the auth flow.
    #[serde(skip_serializing)]
    pub pwd: String,
    pub email: String,
    pub name: String,
    pub active: bool,
    #[sqlx(json)]
    pub roles: Vec<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether the account may obtain new credentials.
    pub fn can_login(&self) -> bool {
        self.active
    }

    /// Identity claims bound into access credentials.
    pub fn claims(&self) -> AccessClaims {
        AccessClaims::new(&self.id, &self.login, self.roles.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAccount {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Login must be between 1-255 characters"
    ))]
    pub login: String,

    #[validate(length(min = 1, message = "Credential is required"))]
    pub pwd: String,

    #[validate(
        email(message = "Must be a valid email"),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,

    #[validate(length(max = 255, message = "Name too long"))]
    pub name: String,

    pub active: bool,

    pub roles: Vec<String>,
}

/// Server-side record backing one issued refresh credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Token {
    pub id: String,
    /// Opaque random string carried inside the refresh credential.
    pub token: String,
    pub expiry: DateTime<Utc>,
    pub account_id: String,
    pub mobile: bool,
    /// "{browser} on {OS}" of the device that logged in.
    pub identifier: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Token {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }

    /// Session claims bound into refresh credentials.
    pub fn claims(&self) -> RefreshClaims {
        RefreshClaims::new(&self.id, &self.token)
    }
}
