//! Database repository for account management operations.
//!
//! Backs the account directory used by the login and refresh flows.

use crate::auth::store::AccountStore;
use crate::database::models::{Account, CreateAccount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::types::Json;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task::spawn_blocking;
use uuid::Uuid;
use validator::Validate;

const ACCOUNT_COLUMNS: &str =
    "id, login, pwd, email, name, active, roles, last_login, created_at, updated_at";

/// Bcrypt cost used by tests; the cheapest the bcrypt crate accepts.
#[cfg(test)]
pub const TEST_HASH_COST: u32 = 4;

/// Repository for account database operations.
///
/// Handles all persistence operations for the Account entity. Credential
/// material is stored as a bcrypt hash and never leaves this repository in
/// clear form.
#[derive(Clone)]
pub struct AccountRepository {
    /// Shared SQLite connection pool
    pool: SqlitePool,
    hash_cost: u32,
    /// Hash verified against when no account matches, so unknown and known
    /// logins cost the same.
    dummy_hash: Arc<OnceCell<String>>,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_hash_cost(pool, DEFAULT_COST)
    }

    /// Creates a repository hashing new credentials with the given bcrypt cost.
    pub fn with_hash_cost(pool: SqlitePool, hash_cost: u32) -> Self {
        Self {
            pool,
            hash_cost,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Creates a new account.
    ///
    /// # Arguments
    /// * `account` - CreateAccount DTO; `pwd` is hashed before storage
    ///
    /// # Returns
    /// The newly created Account with all fields populated
    pub async fn create_account(&self, account: CreateAccount) -> Result<Account> {
        account.validate().context("Invalid account")?;

        let pwd_hash = self.hash(account.pwd.clone()).await?;
        let now = Utc::now();

        let query = format!(
            r#"
            INSERT INTO accounts (id, login, pwd, email, name, active, roles, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(Uuid::now_v7().to_string())
            .bind(&account.login)
            .bind(pwd_hash)
            .bind(&account.email)
            .bind(&account.name)
            .bind(account.active)
            .bind(Json(&account.roles))
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(account)
    }

    /// Checks if a login is already taken.
    pub async fn login_exists(&self, login: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE login = ?")
            .bind(login)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Creates an active administrator account unless `login` is taken.
    ///
    /// # Returns
    /// Whether a new account was created
    pub async fn bootstrap_admin(&self, login: &str, pwd: &str) -> Result<bool> {
        if self.login_exists(login).await? {
            return Ok(false);
        }

        self.create_account(CreateAccount {
            login: login.to_string(),
            pwd: pwd.to_string(),
            email: format!("{}@localhost.localdomain", login),
            name: "Admin Boot".to_string(),
            active: true,
            roles: vec!["admin".to_string()],
        })
        .await?;

        Ok(true)
    }

    async fn hash(&self, pwd: String) -> Result<String> {
        let cost = self.hash_cost;
        spawn_blocking(move || hash(pwd, cost))
            .await
            .context("Credential hashing task failed")?
            .context("Credential hashing failed")
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    /// Retrieves an account by its ID.
    async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?");

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// Retrieves an account by login, returning `None` unless `pwd` matches
    /// the stored hash. A hash is verified whether or not the login exists.
    async fn get_account_by_login(&self, login: &str, pwd: &str) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE login = ?");

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;

        let stored_hash = match &account {
            Some(account) => account.pwd.clone(),
            None => self
                .dummy_hash
                .get_or_try_init(|| self.hash(Uuid::new_v4().to_string()))
                .await?
                .clone(),
        };

        let pwd = pwd.to_string();
        let matches = spawn_blocking(move || verify(pwd, &stored_hash))
            .await
            .context("Credential verification task failed")?
            .context("Credential verification failed")?;

        Ok(account.filter(|_| matches))
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET email = ?, name = ?, active = ?, roles = ?, last_login = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&account.email)
        .bind(&account.name)
        .bind(account.active)
        .bind(Json(&account.roles))
        .bind(account.last_login)
        .bind(Utc::now())
        .bind(&account.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    async fn repository() -> AccountRepository {
        let db = Database::in_memory().await.unwrap();
        AccountRepository::with_hash_cost(db.pool().clone(), TEST_HASH_COST)
    }

    fn root() -> CreateAccount {
        CreateAccount {
            login: "root".to_string(),
            pwd: "agroup".to_string(),
            email: "admin@example.com".to_string(),
            name: "Admin Boot".to_string(),
            active: true,
            roles: vec!["admin".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup_by_login() {
        let repo = repository().await;
        let created = repo.create_account(root()).await.unwrap();
        assert_ne!(created.pwd, "agroup");
        assert_eq!(created.roles, vec!["admin".to_string()]);

        let found = repo.get_account_by_login("root", "agroup").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(created.id.clone()));

        assert!(
            repo.get_account_by_login("root", "wrong")
                .await
                .unwrap()
                .is_none()
        );
        assert!(repo.login_exists("root").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_login_still_verifies_a_hash() {
        let repo = repository().await;
        repo.create_account(root()).await.unwrap();

        assert!(
            repo.get_account_by_login("nobody", "agroup")
                .await
                .unwrap()
                .is_none()
        );
        assert!(repo.dummy_hash.get().is_some());

        // The dummy hash is computed once and reused.
        let first = repo.dummy_hash.get().cloned();
        assert!(
            repo.get_account_by_login("someone", "agroup")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(repo.dummy_hash.get().cloned(), first);
    }

    #[tokio::test]
    async fn test_create_account_validates_input() {
        let repo = repository().await;

        let mut invalid = root();
        invalid.email = "not-an-email".to_string();
        assert!(repo.create_account(invalid).await.is_err());

        let mut empty = root();
        empty.login = String::new();
        assert!(repo.create_account(empty).await.is_err());

        assert!(!repo.login_exists("root").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_account_persists_last_login() {
        let repo = repository().await;
        let mut account = repo.create_account(root()).await.unwrap();
        assert!(account.last_login.is_none());

        account.last_login = Some(Utc::now());
        account.active = false;
        repo.update_account(&account).await.unwrap();

        let stored = repo.get_account(&account.id).await.unwrap().unwrap();
        assert!(stored.last_login.is_some());
        assert!(!stored.can_login());
    }

    #[tokio::test]
    async fn test_bootstrap_admin_runs_once() {
        let repo = repository().await;
        assert!(repo.bootstrap_admin("root", "agroup").await.unwrap());
        assert!(!repo.bootstrap_admin("root", "other").await.unwrap());

        let admin = repo
            .get_account_by_login("root", "agroup")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.can_login());
        assert_eq!(admin.claims().roles, vec!["admin".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_login_is_rejected() {
        let repo = repository().await;
        repo.create_account(root()).await.unwrap();
        assert!(repo.create_account(root()).await.is_err());
    }
}
