//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the database URL, server port, signing secret and credential lifetimes.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub jwt_secret: String,
    /// Lifetime of access credentials.
    pub jwt_expires_in_seconds: u64,
    /// Lifetime of refresh credentials and their backing records.
    pub jwt_refresh_expires_in_seconds: u64,
    /// How often the expiry reaper purges stale refresh records.
    pub token_purge_interval_seconds: u64,
    pub server_port: u16,
    /// Per-request deadline; slower requests are answered with 408.
    pub request_timeout_seconds: u64,
    pub enable_cors: bool,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Credentials for the administrator account created on first start.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub login: String,
    pub pwd: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid number")?;

        let acquire_timeout_seconds = env::var("DB_ACQUIRE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u64>()
            .context("DB_ACQUIRE_TIMEOUT_SECONDS must be a valid number")?;

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET not set")?;

        let jwt_expires_in_seconds = env::var("JWT_EXPIRES_IN_SECONDS")
            .unwrap_or_else(|_| "900".to_string())
            .parse::<u64>()
            .context("JWT_EXPIRES_IN_SECONDS must be a valid number")?;

        let jwt_refresh_expires_in_seconds = env::var("JWT_REFRESH_EXPIRES_IN_SECONDS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse::<u64>()
            .context("JWT_REFRESH_EXPIRES_IN_SECONDS must be a valid number")?;

        let token_purge_interval_seconds = env::var("TOKEN_PURGE_INTERVAL_SECONDS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse::<u64>()
            .context("TOKEN_PURGE_INTERVAL_SECONDS must be a valid number")?;

        if token_purge_interval_seconds == 0 {
            anyhow::bail!("TOKEN_PURGE_INTERVAL_SECONDS must be greater than zero");
        }

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVER_PORT must be a valid number")?;

        let request_timeout_seconds = env::var("REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<u64>()
            .context("REQUEST_TIMEOUT_SECONDS must be a valid number")?;

        let enable_cors = env::var("ENABLE_CORS")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .context("ENABLE_CORS must be true or false")?;

        let bootstrap_admin = match (
            env::var("BOOTSTRAP_ADMIN_LOGIN"),
            env::var("BOOTSTRAP_ADMIN_PWD"),
        ) {
            (Ok(login), Ok(pwd)) if !login.trim().is_empty() => Some(BootstrapAdmin {
                login: login.trim().to_string(),
                pwd,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            jwt_secret,
            jwt_expires_in_seconds,
            jwt_refresh_expires_in_seconds,
            token_purge_interval_seconds,
            server_port,
            request_timeout_seconds,
            enable_cors,
            bootstrap_admin,
        })
    }

    pub fn access_expiry(&self) -> Duration {
        Duration::from_secs(self.jwt_expires_in_seconds)
    }

    pub fn refresh_expiry(&self) -> Duration {
        Duration::from_secs(self.jwt_refresh_expires_in_seconds)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.token_purge_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
