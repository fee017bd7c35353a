//! Main entry point for the authentication backend.
//!
//! This file initializes the Axum web server, sets up the database
//! connection, starts the expiry reaper and serves the API router. On Ctrl-C
//! or SIGTERM the server drains, the reaper stops and the pool closes.

mod api;
mod auth;
mod config;
mod database;
mod errors;
mod repositories;
mod utils;

use crate::auth::service::AuthService;
use crate::repositories::account_repository::AccountRepository;
use crate::repositories::token_repository::TokenRepository;
use crate::utils::jwt::TokenAuth;
use anyhow::Context;
use config::Config;
use database::Database;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::init;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let config = Config::from_env()?;
    let db = Database::new(&config)
        .await
        .context("Failed to connect to database")?;

    let accounts = AccountRepository::new(db.pool().clone());
    if let Some(admin) = &config.bootstrap_admin {
        if accounts.bootstrap_admin(&admin.login, &admin.pwd).await? {
            info!(login = %admin.login, "Created bootstrap admin account");
        }
    }

    let tokens = TokenRepository::new(db.pool().clone());
    let auth_service = Arc::new(AuthService::new(
        Arc::new(accounts),
        Arc::new(tokens),
        Arc::new(TokenAuth::from_config(&config)),
    ));

    let reaper = auth_service.start_reaper(config.purge_interval());

    let app = api::router(auth_service, config.request_timeout(), config.enable_cors);

    let bind_address = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    info!("Starting auth server on port {}", config.server_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.stop().await;
    db.close().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Gracefully shutdown");
}
