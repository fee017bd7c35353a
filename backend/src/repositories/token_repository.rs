//! Database repository for refresh credential records.
//!
//! Rotation is a single conditional `UPDATE` keyed on the presented token
//! string, so two refreshes racing on the same record cannot both match it.
//! Purging is one bulk `DELETE` on the expiry index.

use crate::auth::store::TokenStore;
use crate::database::models::Token;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

const TOKEN_COLUMNS: &str =
    "id, token, expiry, account_id, mobile, identifier, created_at, updated_at";

/// Repository for refresh credential records.
#[derive(Clone)]
pub struct TokenRepository {
    /// Shared SQLite connection pool
    pool: SqlitePool,
}

impl TokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn get_token(&self, token: &str) -> Result<Option<Token>> {
        let query = format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token = ?");

        let token = sqlx::query_as::<_, Token>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }

    async fn create_or_update_token(&self, token: &Token) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tokens (id, token, expiry, account_id, mobile, identifier, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                token = excluded.token,
                expiry = excluded.expiry,
                mobile = excluded.mobile,
                identifier = excluded.identifier,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&token.id)
        .bind(&token.token)
        .bind(token.expiry)
        .bind(&token.account_id)
        .bind(token.mobile)
        .bind(&token.identifier)
        .bind(token.created_at)
        .bind(token.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_token(&self, token: &Token) -> Result<()> {
        sqlx::query("DELETE FROM tokens WHERE id = ?")
            .bind(&token.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn purge_expired_tokens(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tokens WHERE expiry < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn rotate_token(&self, previous: &str, rotated: &Token) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tokens
            SET token = ?, expiry = ?, updated_at = ?
            WHERE id = ? AND token = ? AND expiry > ?
            "#,
        )
        .bind(&rotated.token)
        .bind(rotated.expiry)
        .bind(rotated.updated_at)
        .bind(&rotated.id)
        .bind(previous)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
