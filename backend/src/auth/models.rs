//! Data structures for authentication requests and responses.
//!
//! This module defines the login payload, the credential pair returned by
//! login and refresh, and the profile view of the authenticated account.

use crate::database::models::Account;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::Validate;

/// Login request payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        length(max = 255, message = "Login too long"),
        custom(function = "validate_login")
    )]
    pub login: String,

    #[serde(default)]
    pub pwd: String,
}

impl LoginRequest {
    /// Login with surrounding whitespace removed.
    pub fn normalized_login(&self) -> &str {
        self.login.trim()
    }
}

fn validate_login(login: &str) -> Result<(), validator::ValidationError> {
    let login = login.trim();
    if login.is_empty() {
        return Err(validator::ValidationError::new("required")
            .with_message(Cow::Borrowed("Login is required")));
    }
    if !login.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(validator::ValidationError::new("alphanumeric")
            .with_message(Cow::Borrowed("Login must be alphanumeric")));
    }
    Ok(())
}

/// Access/refresh credential pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Account information returned by `/me`
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    pub login: String,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<Account> for AccountInfo {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            login: account.login,
            email: account.email,
            name: account.name,
            roles: account.roles,
            last_login: account.last_login,
        }
    }
}
