//! In-memory account directory and credential store.
//!
//! Implements both storage traits over two maps behind async mutexes. Every
//! operation completes inside one critical section, which makes rotation a
//! compare-and-swap on the token string.

use crate::auth::store::{AccountStore, TokenStore};
use crate::database::models::{Account, Token};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    accounts: Mutex<HashMap<String, Account>>,
    /// Records keyed by record id
    tokens: Mutex<HashMap<String, Token>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an account. `pwd` is compared verbatim on login.
    pub async fn insert_account(&self, account: Account) {
        self.accounts
            .lock()
            .await
            .insert(account.id.clone(), account);
    }

    /// Snapshot of every stored record.
    pub async fn tokens(&self) -> Vec<Token> {
        self.tokens.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.accounts.lock().await.get(id).cloned())
    }

    async fn get_account_by_login(&self, login: &str, pwd: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .find(|a| a.login == login && a.pwd == pwd)
            .cloned())
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.lock().await;
        if let Some(stored) = accounts.get_mut(&account.id) {
            *stored = Account {
                updated_at: Utc::now(),
                ..account.clone()
            };
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get_token(&self, token: &str) -> Result<Option<Token>> {
        Ok(self
            .tokens
            .lock()
            .await
            .values()
            .find(|t| t.token == token)
            .cloned())
    }

    async fn create_or_update_token(&self, token: &Token) -> Result<()> {
        let mut tokens = self.tokens.lock().await;
        if tokens
            .values()
            .any(|t| t.token == token.token && t.id != token.id)
        {
            anyhow::bail!("token string already in use");
        }
        tokens.insert(token.id.clone(), token.clone());
        Ok(())
    }

    async fn delete_token(&self, token: &Token) -> Result<()> {
        self.tokens.lock().await.remove(&token.id);
        Ok(())
    }

    async fn purge_expired_tokens(&self) -> Result<u64> {
        let now = Utc::now();
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.expiry >= now);
        Ok((before - tokens.len()) as u64)
    }

    async fn rotate_token(&self, previous: &str, rotated: &Token) -> Result<bool> {
        let now = Utc::now();
        let mut tokens = self.tokens.lock().await;
        match tokens.get_mut(&rotated.id) {
            Some(stored) if stored.token == previous && !stored.is_expired_at(now) => {
                stored.token = rotated.token.clone();
                stored.expiry = rotated.expiry;
                stored.updated_at = rotated.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
