//! Core business logic for the authentication system.
//!
//! `AuthService` exchanges account credentials for an access/refresh pair,
//! rotates refresh credentials and revokes them on logout. Every refresh
//! credential is backed by a [`Token`] record; rotation swaps the record's
//! opaque token string atomically, so a refresh credential is single-use.

use crate::auth::models::{AccountInfo, LoginRequest, TokenResponse};
use crate::auth::reaper::{ExpiryReaper, ReaperHandle};
use crate::auth::store::{AccountStore, TokenStore};
use crate::database::models::{Account, Token};
use crate::errors::{ServiceError, ServiceResult};
use crate::utils::device::DeviceInfo;
use crate::utils::jwt::{AccessClaims, RefreshToken, TokenAuth};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Authentication service for handling login, refresh and logout
#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    tokens: Arc<dyn TokenStore>,
    token_auth: Arc<TokenAuth>,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        tokens: Arc<dyn TokenStore>,
        token_auth: Arc<TokenAuth>,
    ) -> Self {
        Self {
            accounts,
            tokens,
            token_auth,
        }
    }

    pub fn token_auth(&self) -> Arc<TokenAuth> {
        self.token_auth.clone()
    }

    /// Authenticate an account and issue a new credential pair.
    ///
    /// Each successful login creates its own credential record, tagged with
    /// the device parsed from `user_agent`.
    #[tracing::instrument(skip_all, fields(login = %request.normalized_login()))]
    pub async fn login(
        &self,
        request: LoginRequest,
        user_agent: &str,
    ) -> ServiceResult<TokenResponse> {
        if let Err(validation_errors) = request.validate() {
            return Err(validation_error(validation_errors));
        }

        let mut account = self
            .accounts
            .get_account_by_login(request.normalized_login(), &request.pwd)
            .await?
            .ok_or_else(ServiceError::unknown_login)?;

        if !account.can_login() {
            return Err(ServiceError::login_disabled());
        }

        let device = DeviceInfo::from_user_agent(user_agent);
        let now = Utc::now();
        let token = Token {
            id: Uuid::now_v7().to_string(),
            token: Uuid::new_v4().to_string(),
            expiry: now + self.refresh_ttl()?,
            account_id: account.id.clone(),
            mobile: device.mobile,
            identifier: device.identifier,
            created_at: now,
            updated_at: now,
        };

        self.tokens.create_or_update_token(&token).await?;

        let (access_token, refresh_token) = self
            .token_auth
            .gen_token_pair(account.claims(), token.claims())?;

        self.record_last_login(&mut account, now).await;

        info!(
            account_id = %account.id,
            device = %token.identifier,
            mobile = token.mobile,
            "Login succeeded"
        );

        Ok(TokenResponse {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh credential for a new pair, rotating its record.
    ///
    /// The presented credential is consumed: a second exchange with it, or
    /// one racing this call, fails as "token expired".
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self, presented: &RefreshToken) -> ServiceResult<TokenResponse> {
        let record = self
            .tokens
            .get_token(presented.as_str())
            .await?
            .ok_or_else(ServiceError::token_expired)?;

        let now = Utc::now();
        if record.is_expired_at(now) {
            self.tokens.delete_token(&record).await?;
            return Err(ServiceError::token_expired());
        }

        let mut account = self
            .accounts
            .get_account(&record.account_id)
            .await?
            .ok_or_else(ServiceError::unknown_login)?;

        if !account.can_login() {
            return Err(ServiceError::login_disabled());
        }

        let rotated = Token {
            token: Uuid::new_v4().to_string(),
            expiry: now + self.refresh_ttl()?,
            updated_at: now,
            ..record.clone()
        };

        // Nothing is committed until the pair has been minted.
        let (access_token, refresh_token) = self
            .token_auth
            .gen_token_pair(account.claims(), rotated.claims())?;

        if !self.tokens.rotate_token(&record.token, &rotated).await? {
            warn!(token_id = %record.id, "Refresh lost rotation race");
            return Err(ServiceError::token_expired());
        }

        // The rotation is committed; from here on the new pair must be returned.
        self.record_last_login(&mut account, now).await;

        info!(account_id = %account.id, token_id = %rotated.id, "Refresh token rotated");

        Ok(TokenResponse {
            access_token,
            refresh_token,
        })
    }

    /// Revoke a refresh credential by deleting its record.
    #[tracing::instrument(skip_all)]
    pub async fn logout(&self, presented: &RefreshToken) -> ServiceResult<()> {
        let record = self
            .tokens
            .get_token(presented.as_str())
            .await?
            .ok_or_else(ServiceError::token_expired)?;

        self.tokens.delete_token(&record).await?;

        info!(account_id = %record.account_id, token_id = %record.id, "Logged out");
        Ok(())
    }

    /// Profile of the account an access credential was issued to.
    pub async fn profile(&self, claims: &AccessClaims) -> ServiceResult<AccountInfo> {
        let account = self
            .accounts
            .get_account(claims.account_id())
            .await?
            .ok_or_else(ServiceError::unknown_login)?;

        Ok(account.into())
    }

    /// Start the background purge of expired credential records.
    pub fn start_reaper(&self, interval: Duration) -> ReaperHandle {
        ExpiryReaper::new(self.tokens.clone(), interval).spawn()
    }

    /// Stamp `last_login`. Runs after the credential is committed, so a
    /// failure is logged rather than returned.
    async fn record_last_login(&self, account: &mut Account, at: DateTime<Utc>) {
        account.last_login = Some(at);
        if let Err(e) = self.accounts.update_account(account).await {
            warn!(account_id = %account.id, "Failed to record last login: {:#}", e);
        }
    }

    fn refresh_ttl(&self) -> ServiceResult<ChronoDuration> {
        ChronoDuration::from_std(self.token_auth.refresh_expiry())
            .map_err(|e| ServiceError::internal_error(format!("Invalid refresh expiry: {}", e)))
    }
}

fn validation_error(validation_errors: validator::ValidationErrors) -> ServiceError {
    let error_messages: Vec<String> = validation_errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error.message.as_ref().unwrap_or(&"Invalid value".into())
                )
            })
        })
        .collect();

    ServiceError::validation(error_messages.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::database::models::CreateAccount;
    use crate::repositories::account_repository::{AccountRepository, TEST_HASH_COST};
    use crate::repositories::memory_store::MemoryStore;
    use crate::repositories::token_repository::TokenRepository;
    use crate::utils::jwt::RefreshClaims;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";

    fn token_auth() -> Arc<TokenAuth> {
        Arc::new(TokenAuth::new(
            "test-secret",
            Duration::from_secs(15 * 60),
            Duration::from_secs(60 * 60),
        ))
    }

    fn account(id: &str, login: &str, pwd: &str, active: bool) -> Account {
        let now = Utc::now();
        Account {
            id: id.to_string(),
            login: login.to_string(),
            pwd: pwd.to_string(),
            email: format!("{login}@example.com"),
            name: login.to_string(),
            active,
            roles: vec!["admin".to_string()],
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup() -> (AuthService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_account(account("acc-root", "root", "agroup", true))
            .await;
        store
            .insert_account(account("acc-off", "disabled", "agroup", false))
            .await;

        let service = AuthService::new(store.clone(), store.clone(), token_auth());
        (service, store)
    }

    /// Token store that yields to the scheduler after every lookup, letting
    /// concurrent refreshes interleave between lookup and rotation.
    struct YieldingTokens {
        inner: Arc<MemoryStore>,
        /// Lookups that found a record
        hits: AtomicUsize,
    }

    impl YieldingTokens {
        fn new(inner: Arc<MemoryStore>) -> Self {
            Self {
                inner,
                hits: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TokenStore for YieldingTokens {
        async fn get_token(&self, token: &str) -> anyhow::Result<Option<Token>> {
            let found = self.inner.get_token(token).await?;
            if found.is_some() {
                self.hits.fetch_add(1, Ordering::SeqCst);
            }
            tokio::task::yield_now().await;
            Ok(found)
        }
        async fn create_or_update_token(&self, token: &Token) -> anyhow::Result<()> {
            self.inner.create_or_update_token(token).await
        }
        async fn delete_token(&self, token: &Token) -> anyhow::Result<()> {
            self.inner.delete_token(token).await
        }
        async fn purge_expired_tokens(&self) -> anyhow::Result<u64> {
            self.inner.purge_expired_tokens().await
        }
        async fn rotate_token(&self, previous: &str, rotated: &Token) -> anyhow::Result<bool> {
            self.inner.rotate_token(previous, rotated).await
        }
    }

    /// Account directory whose writes always fail.
    struct ReadOnlyAccounts(Arc<MemoryStore>);

    #[async_trait]
    impl AccountStore for ReadOnlyAccounts {
        async fn get_account(&self, id: &str) -> anyhow::Result<Option<Account>> {
            self.0.get_account(id).await
        }
        async fn get_account_by_login(
            &self,
            login: &str,
            pwd: &str,
        ) -> anyhow::Result<Option<Account>> {
            self.0.get_account_by_login(login, pwd).await
        }
        async fn update_account(&self, _account: &Account) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn login_request(login: &str, pwd: &str) -> LoginRequest {
        LoginRequest {
            login: login.to_string(),
            pwd: pwd.to_string(),
        }
    }

    fn presented(service: &AuthService, refresh_token: &str) -> RefreshToken {
        service.token_auth().verify_refresh(refresh_token).unwrap()
    }

    /// Refresh credential for an arbitrary record, bypassing login.
    fn credential_for(service: &AuthService, token: &Token) -> RefreshToken {
        let (_, refresh) = service
            .token_auth()
            .gen_token_pair(
                AccessClaims::new(&token.account_id, "root", vec![]),
                RefreshClaims::new(&token.id, &token.token),
            )
            .unwrap();
        presented(service, &refresh)
    }

    #[tokio::test]
    async fn test_login_issues_pair_and_one_record() {
        let (service, store) = setup().await;

        let pair = service
            .login(login_request("root", "agroup"), FIREFOX_LINUX)
            .await
            .unwrap();

        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
        assert_ne!(pair.access_token, pair.refresh_token);

        let tokens = store.tokens().await;
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].account_id, "acc-root");
        assert!(!tokens[0].mobile);
        assert_eq!(tokens[0].identifier, "Firefox on Linux");
        assert!(tokens[0].expiry > Utc::now() + ChronoDuration::minutes(59));

        let claims = service
            .token_auth()
            .verify_access(&pair.access_token)
            .unwrap();
        assert_eq!(claims.account_id(), "acc-root");
        assert_eq!(claims.roles, vec!["admin".to_string()]);

        let stored = store.get_account("acc-root").await.unwrap().unwrap();
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn test_every_login_creates_an_independent_record() {
        let (service, store) = setup().await;

        let first = service
            .login(login_request("root", "agroup"), FIREFOX_LINUX)
            .await
            .unwrap();
        let second = service
            .login(login_request(" root ", "agroup"), FIREFOX_LINUX)
            .await
            .unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        assert_eq!(store.tokens().await.len(), 2);
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_login_before_storage() {
        let (service, store) = setup().await;

        for login in ["", "   ", "ro ot", "root!"] {
            let err = service
                .login(login_request(login, "agroup"), FIREFOX_LINUX)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation { .. }));
        }
        assert!(store.tokens().await.is_empty());
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (service, store) = setup().await;

        let err = service
            .login(login_request("root", "wrong"), FIREFOX_LINUX)
            .await
            .unwrap_err();
        assert_eq!(err.unauthorized_message(), Some("unknown login"));

        let err = service
            .login(login_request("nobody", "agroup"), FIREFOX_LINUX)
            .await
            .unwrap_err();
        assert_eq!(err.unauthorized_message(), Some("unknown login"));

        let err = service
            .login(login_request("disabled", "agroup"), FIREFOX_LINUX)
            .await
            .unwrap_err();
        assert_eq!(err.unauthorized_message(), Some("login disabled"));

        assert!(store.tokens().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_is_single_use() {
        let (service, store) = setup().await;
        let pair = service
            .login(login_request("root", "agroup"), FIREFOX_LINUX)
            .await
            .unwrap();
        let before = store.tokens().await[0].clone();

        let first = presented(&service, &pair.refresh_token);
        let rotated = service.refresh(&first).await.unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);
        assert_ne!(rotated.access_token, pair.access_token);

        let after = store.tokens().await;
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, before.id);
        assert_ne!(after[0].token, before.token);
        assert_eq!(after[0].identifier, before.identifier);

        let err = service.refresh(&first).await.unwrap_err();
        assert_eq!(err.unauthorized_message(), Some("token expired"));

        // The rotated credential remains usable.
        let second = presented(&service, &rotated.refresh_token);
        assert!(service.refresh(&second).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_has_one_winner() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_account(account("acc-root", "root", "agroup", true))
            .await;
        let tokens = Arc::new(YieldingTokens::new(store.clone()));
        let service = AuthService::new(store.clone(), tokens.clone(), token_auth());

        let pair = service
            .login(login_request("root", "agroup"), FIREFOX_LINUX)
            .await
            .unwrap();
        let credential = presented(&service, &pair.refresh_token);

        let (a, b) = tokio::join!(service.refresh(&credential), service.refresh(&credential));

        // Both refreshes found the live record before either rotated it.
        assert_eq!(tokens.hits.load(Ordering::SeqCst), 2);
        assert!(a.is_ok() ^ b.is_ok());
        let loser = a.err().or(b.err()).unwrap();
        assert_eq!(loser.unauthorized_message(), Some("token expired"));
        assert_eq!(store.tokens().await.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_returns_pair_when_last_login_write_fails() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_account(account("acc-root", "root", "agroup", true))
            .await;
        let service = AuthService::new(
            Arc::new(ReadOnlyAccounts(store.clone())),
            store.clone(),
            token_auth(),
        );

        let pair = service
            .login(login_request("root", "agroup"), FIREFOX_LINUX)
            .await
            .unwrap();
        let first = presented(&service, &pair.refresh_token);

        let rotated = service.refresh(&first).await.unwrap();

        // The delivered pair is the live one; the presented one is spent.
        let second = presented(&service, &rotated.refresh_token);
        assert!(service.refresh(&second).await.is_ok());
        let err = service.refresh(&first).await.unwrap_err();
        assert_eq!(err.unauthorized_message(), Some("token expired"));
    }

    #[tokio::test]
    async fn test_refresh_deletes_expired_record() {
        let (service, store) = setup().await;
        let past = Utc::now() - ChronoDuration::minutes(1);
        let stale = Token {
            id: "tok-stale".to_string(),
            token: Uuid::new_v4().to_string(),
            expiry: past,
            account_id: "acc-root".to_string(),
            mobile: false,
            identifier: "Firefox on Linux".to_string(),
            created_at: past,
            updated_at: past,
        };
        store.create_or_update_token(&stale).await.unwrap();

        let err = service
            .refresh(&credential_for(&service, &stale))
            .await
            .unwrap_err();
        assert_eq!(err.unauthorized_message(), Some("token expired"));
        assert!(store.tokens().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_rejects_disabled_or_missing_account() {
        let (service, store) = setup().await;
        let pair = service
            .login(login_request("root", "agroup"), FIREFOX_LINUX)
            .await
            .unwrap();

        let mut root = store.get_account("acc-root").await.unwrap().unwrap();
        root.active = false;
        store.update_account(&root).await.unwrap();

        let credential = presented(&service, &pair.refresh_token);
        let err = service.refresh(&credential).await.unwrap_err();
        assert_eq!(err.unauthorized_message(), Some("login disabled"));

        let now = Utc::now();
        let orphan = Token {
            id: "tok-orphan".to_string(),
            token: Uuid::new_v4().to_string(),
            expiry: now + ChronoDuration::hours(1),
            account_id: "acc-gone".to_string(),
            mobile: false,
            identifier: "UNKNOWN on UNKNOWN".to_string(),
            created_at: now,
            updated_at: now,
        };
        store.create_or_update_token(&orphan).await.unwrap();
        let err = service
            .refresh(&credential_for(&service, &orphan))
            .await
            .unwrap_err();
        assert_eq!(err.unauthorized_message(), Some("unknown login"));
    }

    #[tokio::test]
    async fn test_logout_revokes_refresh_credential() {
        let (service, store) = setup().await;
        let pair = service
            .login(login_request("root", "agroup"), FIREFOX_LINUX)
            .await
            .unwrap();
        let credential = presented(&service, &pair.refresh_token);

        service.logout(&credential).await.unwrap();
        assert!(store.tokens().await.is_empty());

        let err = service.refresh(&credential).await.unwrap_err();
        assert_eq!(err.unauthorized_message(), Some("token expired"));

        let err = service.logout(&credential).await.unwrap_err();
        assert_eq!(err.unauthorized_message(), Some("token expired"));

        // The account itself is untouched.
        assert!(
            store
                .get_account("acc-root")
                .await
                .unwrap()
                .unwrap()
                .can_login()
        );
    }

    #[tokio::test]
    async fn test_profile_resolves_account_from_claims() {
        let (service, _store) = setup().await;
        let pair = service
            .login(login_request("root", "agroup"), FIREFOX_LINUX)
            .await
            .unwrap();

        let claims = service
            .token_auth()
            .verify_access(&pair.access_token)
            .unwrap();
        let profile = service.profile(&claims).await.unwrap();
        assert_eq!(profile.login, "root");
        assert_eq!(profile.roles, vec!["admin".to_string()]);
        assert!(profile.last_login.is_some());
    }

    #[tokio::test]
    async fn test_flow_over_sqlite_repositories() {
        let db = Database::in_memory().await.unwrap();
        let accounts = AccountRepository::with_hash_cost(db.pool().clone(), TEST_HASH_COST);
        accounts
            .create_account(CreateAccount {
                login: "user".to_string(),
                pwd: "agroup07".to_string(),
                email: "user@example.com".to_string(),
                name: "User Boot".to_string(),
                active: true,
                roles: vec![],
            })
            .await
            .unwrap();
        let tokens = TokenRepository::new(db.pool().clone());

        let service = AuthService::new(Arc::new(accounts), Arc::new(tokens.clone()), token_auth());

        let pair = service
            .login(login_request("user", "agroup07"), FIREFOX_LINUX)
            .await
            .unwrap();
        let first = presented(&service, &pair.refresh_token);

        let rotated = service.refresh(&first).await.unwrap();
        let err = service.refresh(&first).await.unwrap_err();
        assert_eq!(err.unauthorized_message(), Some("token expired"));

        let second = presented(&service, &rotated.refresh_token);
        service.logout(&second).await.unwrap();
        assert!(tokens.get_token(second.as_str()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_over_sqlite_has_one_winner() {
        let db = Database::in_memory().await.unwrap();
        let accounts = AccountRepository::with_hash_cost(db.pool().clone(), TEST_HASH_COST);
        accounts.bootstrap_admin("root", "agroup").await.unwrap();
        let tokens = TokenRepository::new(db.pool().clone());
        let service = AuthService::new(Arc::new(accounts), Arc::new(tokens), token_auth());

        let pair = service
            .login(login_request("root", "agroup"), FIREFOX_LINUX)
            .await
            .unwrap();
        let credential = presented(&service, &pair.refresh_token);

        let (a, b) = tokio::join!(service.refresh(&credential), service.refresh(&credential));

        assert!(a.is_ok() ^ b.is_ok());
        let loser = a.err().or(b.err()).unwrap();
        assert_eq!(loser.unauthorized_message(), Some("token expired"));
    }
}
