//! Storage capabilities consumed by the auth orchestrator.
//!
//! Both traits have a SQLite implementation in `repositories` and an
//! in-memory one for tests.

use crate::database::models::{Account, Token};
use anyhow::Result;
use async_trait::async_trait;

/// Lookup and update of user accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Returns the account with the given id, if any.
    async fn get_account(&self, id: &str) -> Result<Option<Account>>;
    /// Returns the account whose login matches and whose credential material
    /// accepts `pwd`. A wrong login and a wrong credential are indistinguishable.
    async fn get_account_by_login(&self, login: &str, pwd: &str) -> Result<Option<Account>>;
    async fn update_account(&self, account: &Account) -> Result<()>;
}

/// Durable storage of refresh credential records.
///
/// Every call to `create_or_update_token` with a fresh record id creates an
/// independent session; records are never merged per account or device.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_token(&self, token: &str) -> Result<Option<Token>>;
    /// Inserts the record, or overwrites the record with the same id.
    async fn create_or_update_token(&self, token: &Token) -> Result<()>;
    async fn delete_token(&self, token: &Token) -> Result<()>;
    /// Deletes every record whose expiry is strictly before now and returns
    /// how many were removed.
    async fn purge_expired_tokens(&self) -> Result<u64>;
    /// Atomically replaces the record currently holding `previous` with
    /// `rotated`, provided it has not expired yet. Returns `false` when no live
    /// record holds `previous` any more, in which case nothing changed.
    async fn rotate_token(&self, previous: &str, rotated: &Token) -> Result<bool>;
}
