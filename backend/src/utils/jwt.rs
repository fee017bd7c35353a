//! JWT token utilities for authentication and authorization.
//!
//! Mints access/refresh credential pairs and verifies them through two
//! independent lanes. Access claims identify the account and its roles,
//! refresh claims carry the opaque token string of a credential record. Each
//! shape is tagged with its [`TokenKind`] so one can never stand in for the
//! other.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::{ServiceError, ServiceResult};

/// Discriminates the two credential shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims of a short-lived access credential.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Account login
    pub sub: String,
    /// Account ID
    pub id: String,
    pub roles: Vec<String>,
    pub typ: TokenKind,
    /// Unique credential identifier
    pub jti: String,
    pub exp: usize,
    pub iat: usize,
}

/// Claims of a refresh credential.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    /// Credential record ID
    pub id: String,
    /// Opaque token string of the credential record
    pub token: String,
    pub typ: TokenKind,
    pub exp: usize,
    pub iat: usize,
}

impl AccessClaims {
    /// Build unsigned claims; `exp` and `iat` are stamped when minted.
    pub fn new(id: &str, login: &str, roles: Vec<String>) -> Self {
        Self {
            sub: login.to_string(),
            id: id.to_string(),
            roles,
            typ: TokenKind::Access,
            jti: Uuid::new_v4().to_string(),
            exp: 0,
            iat: 0,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.id
    }

}

impl RefreshClaims {
    pub fn new(id: &str, token: &str) -> Self {
        Self {
            id: id.to_string(),
            token: token.to_string(),
            typ: TokenKind::Refresh,
            exp: 0,
            iat: 0,
        }
    }
}

/// Raw opaque token string of a verified refresh credential.
///
/// Only [`TokenAuth::verify_refresh`] produces this value, so a handler
/// receiving one knows the refresh lane has already run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken(String);

impl RefreshToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Signing configuration and lifetimes for credential pairs.
pub struct TokenAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_expiry: Duration,
    refresh_expiry: Duration,
}

impl TokenAuth {
    pub fn new(secret: &str, access_expiry: Duration, refresh_expiry: Duration) -> Self {
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        TokenAuth {
            encoding_key,
            decoding_key,
            validation,
            access_expiry,
            refresh_expiry,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret,
            config.access_expiry(),
            config.refresh_expiry(),
        )
    }

    pub fn access_expiry(&self) -> Duration {
        self.access_expiry
    }

    pub fn refresh_expiry(&self) -> Duration {
        self.refresh_expiry
    }

    /// Sign an access and a refresh credential, each with its own expiry.
    pub fn gen_token_pair(
        &self,
        mut access: AccessClaims,
        mut refresh: RefreshClaims,
    ) -> ServiceResult<(String, String)> {
        let now = Utc::now().timestamp().max(0) as usize;

        access.typ = TokenKind::Access;
        access.iat = now;
        access.exp = now + self.access_expiry.as_secs() as usize;

        refresh.typ = TokenKind::Refresh;
        refresh.iat = now;
        refresh.exp = now + self.refresh_expiry.as_secs() as usize;

        let access_token = encode(&Header::default(), &access, &self.encoding_key)
            .map_err(|e| ServiceError::internal_error(format!("Token generation failed: {}", e)))?;

        let refresh_token = encode(&Header::default(), &refresh, &self.encoding_key).map_err(
            |e| ServiceError::internal_error(format!("Refresh token generation failed: {}", e)),
        )?;

        Ok((access_token, refresh_token))
    }

    /// Verify an access credential and return its claims.
    pub fn verify_access(&self, token: &str) -> ServiceResult<AccessClaims> {
        let claims: AccessClaims = self.decode(token)?;
        if claims.typ != TokenKind::Access {
            return Err(ServiceError::token_unauthorized());
        }
        Ok(claims)
    }

    /// Verify a refresh credential and return the opaque token it carries.
    pub fn verify_refresh(&self, token: &str) -> ServiceResult<RefreshToken> {
        let claims: RefreshClaims = self.decode(token)?;
        if claims.typ != TokenKind::Refresh || claims.token.is_empty() {
            return Err(ServiceError::token_unauthorized());
        }
        Ok(RefreshToken(claims.token))
    }

    fn decode<T: DeserializeOwned>(&self, token: &str) -> ServiceResult<T> {
        decode::<T>(token, &self.decoding_key, &self.validation)
            .map(|token_data| token_data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ServiceError::token_expired(),
                _ => {
                    tracing::debug!("Token validation failed: {}", e);
                    ServiceError::token_unauthorized()
                }
            })
    }
}
