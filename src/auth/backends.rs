//! Pluggable sign-in and refresh strategies.
//!
//! The controllers only see the [`AuthenticationBackend`] and
//! [`RefreshBackend`] traits. [`StoreAuthentication`] and [`TokenRefresh`]
//! are the stock implementations.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    dto::{AccessToken, Credentials, RefreshToken, TokenAccess},
    jwt::{JwtKeys, TokenKind},
    store::{StoreError, UserRecord, UserStore},
};
use crate::error::AuthError;

#[async_trait]
pub trait AuthenticationBackend: Send + Sync {
    async fn authenticate(&self, credentials: Credentials) -> Result<TokenAccess, AuthError>;
}

#[async_trait]
pub trait RefreshBackend: Send + Sync {
    async fn refresh(&self, request: RefreshToken) -> Result<AccessToken, AuthError>;
}

/// Checks credentials against a [`UserStore`] and issues an access/refresh
/// pair for active users.
pub struct StoreAuthentication<S> {
    store: S,
    keys: JwtKeys,
}

impl<S: UserStore> StoreAuthentication<S> {
    pub fn new(store: S, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    /// Users flagged inactive may not sign in.
    pub fn user_can_authenticate(&self, user: &S::User) -> bool {
        user.is_active()
    }

    fn issue_pair(&self, subject: &str) -> Result<TokenAccess, AuthError> {
        Ok(TokenAccess {
            access_token: self.keys.sign_access(subject)?,
            refresh_token: self.keys.sign_refresh(subject)?,
        })
    }
}

#[async_trait]
impl<S: UserStore> AuthenticationBackend for StoreAuthentication<S> {
    async fn authenticate(&self, credentials: Credentials) -> Result<TokenAccess, AuthError> {
        let user = match self.store.get(&credentials.identifier).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                // Pay for one hash so a miss costs the same as a wrong password.
                self.store.set_password(&credentials.password).await?;
                warn!(identifier = %credentials.identifier, "signin unknown identifier");
                return Err(AuthError::invalid_credentials());
            }
            Err(StoreError::Backend(e)) => return Err(AuthError::Internal(e)),
        };

        let password_ok = user.check_password(&credentials.password).await?;
        if !password_ok || !self.user_can_authenticate(&user) {
            warn!(
                identifier = %credentials.identifier,
                user_id = %user.id(),
                password_ok,
                "signin rejected"
            );
            return Err(AuthError::invalid_credentials());
        }

        let pair = self.issue_pair(&user.id())?;
        debug!(user_id = %user.id(), "signin succeeded");
        Ok(pair)
    }
}

/// Exchanges a valid refresh token for a new access token.
pub struct TokenRefresh {
    keys: JwtKeys,
}

impl TokenRefresh {
    pub fn new(keys: JwtKeys) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl RefreshBackend for TokenRefresh {
    async fn refresh(&self, request: RefreshToken) -> Result<AccessToken, AuthError> {
        let token = self.keys.verify(&request.refresh_token).map_err(|e| {
            warn!(error = %e, "refresh token rejected");
            AuthError::invalid_token()
        })?;
        if !self.keys.is_kind(&token, TokenKind::Refresh) {
            warn!(sub = %token.sub, token_type = ?token.token_type(), "refresh with non-refresh token");
            return Err(AuthError::NotAuthorized(
                "Only refresh tokens are allowed.".into(),
            ));
        }
        let access_token = self.keys.sign_access(&token.sub)?;
        debug!(sub = %token.sub, "access token refreshed");
        Ok(AccessToken { access_token })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use jsonwebtoken::EncodingKey;
    use time::OffsetDateTime;

    use super::*;
    use crate::{
        auth::store::MemoryUserStore,
        config::SimpleJwtConfig,
        token::{Token, TOKEN_TYPE_CLAIM},
    };

    pub(crate) const SECRET: &str = "sf8&h5_pki5m3iuzd7$a^sl!#=w9%c=4shdi&!t!9v4f)z(%ii";

    pub(crate) fn keys() -> JwtKeys {
        JwtKeys::new(Arc::new(SimpleJwtConfig::new(SECRET)))
    }

    pub(crate) async fn seeded_store() -> MemoryUserStore {
        let store = MemoryUserStore::new();
        store
            .insert("1", "alice@example.com", "alice-password", true)
            .await
            .unwrap();
        store
            .insert("2", "bob@example.com", "bob-password", false)
            .await
            .unwrap();
        store
    }

    fn creds(identifier: &str, password: &str) -> Credentials {
        Credentials {
            identifier: identifier.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn valid_credentials_issue_a_pair() {
        let keys = keys();
        let backend = StoreAuthentication::new(seeded_store().await, keys.clone());
        let pair = backend
            .authenticate(creds("alice@example.com", "alice-password"))
            .await
            .expect("authenticate");

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let access = keys.verify(&pair.access_token).unwrap();
        assert_eq!(access.sub, "1");
        assert!(keys.is_kind(&access, TokenKind::Access));
        assert!((access.exp - (now + 300)).abs() <= 2);

        let refresh = keys.verify(&pair.refresh_token).unwrap();
        assert_eq!(refresh.sub, "1");
        assert!(keys.is_kind(&refresh, TokenKind::Refresh));
        assert!((refresh.exp - (now + 86_400)).abs() <= 2);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let backend = StoreAuthentication::new(seeded_store().await, keys());
        let err = backend
            .authenticate(creds("alice@example.com", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAuthorized(d) if d == "Invalid credentials."));
    }

    #[tokio::test]
    async fn unknown_user_is_unauthorized() {
        let backend = StoreAuthentication::new(seeded_store().await, keys());
        let err = backend
            .authenticate(creds("ghost@example.com", "whatever"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAuthorized(d) if d == "Invalid credentials."));
    }

    #[tokio::test]
    async fn inactive_user_is_unauthorized_even_with_right_password() {
        let backend = StoreAuthentication::new(seeded_store().await, keys());
        let err = backend
            .authenticate(creds("bob@example.com", "bob-password"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAuthorized(_)));
    }

    /// Store whose hasher is a fixed sleep, counting every invocation.
    #[derive(Default)]
    struct SlowStore {
        hashes: AtomicUsize,
    }

    struct SlowUser;

    const HASH_COST: Duration = Duration::from_millis(250);

    #[async_trait]
    impl UserRecord for SlowUser {
        fn id(&self) -> String {
            "9".into()
        }

        async fn check_password(&self, plain: &str) -> anyhow::Result<bool> {
            tokio::time::sleep(HASH_COST).await;
            Ok(plain == "right")
        }
    }

    #[async_trait]
    impl UserStore for Arc<SlowStore> {
        type User = SlowUser;

        async fn get(&self, identifier: &str) -> Result<SlowUser, StoreError> {
            if identifier == "known" {
                Ok(SlowUser)
            } else {
                Err(StoreError::NotFound)
            }
        }

        async fn set_password(&self, _plain: &str) -> anyhow::Result<()> {
            self.hashes.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(HASH_COST).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_user_costs_as_much_as_wrong_password() {
        let store = Arc::new(SlowStore::default());
        let backend = StoreAuthentication::new(store.clone(), keys());

        let started = tokio::time::Instant::now();
        assert!(backend.authenticate(creds("missing", "x")).await.is_err());
        let unknown = started.elapsed();

        let started = tokio::time::Instant::now();
        assert!(backend.authenticate(creds("known", "wrong")).await.is_err());
        let wrong = started.elapsed();

        assert_eq!(store.hashes.load(Ordering::SeqCst), 1);
        assert!(unknown >= HASH_COST);
        assert!(wrong >= HASH_COST);
        let diff = if unknown > wrong { unknown - wrong } else { wrong - unknown };
        assert!(diff < HASH_COST / 10, "unknown={unknown:?} wrong={wrong:?}");
    }

    #[tokio::test]
    async fn refresh_issues_new_access_token_for_same_subject() {
        let keys = keys();
        let refresh = TokenRefresh::new(keys.clone());
        let refresh_token = keys.sign_refresh("1").unwrap();
        let out = refresh
            .refresh(RefreshToken { refresh_token })
            .await
            .expect("refresh");
        let access = keys.verify(&out.access_token).unwrap();
        assert_eq!(access.sub, "1");
        assert!(keys.is_kind(&access, TokenKind::Access));
    }

    #[tokio::test]
    async fn refresh_rejects_access_token() {
        let keys = keys();
        let refresh = TokenRefresh::new(keys.clone());
        let err = refresh
            .refresh(RefreshToken {
                refresh_token: keys.sign_access("1").unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAuthorized(d) if d.contains("Only refresh")));
    }

    #[tokio::test]
    async fn refresh_rejects_expired_token() {
        let keys = keys();
        let refresh = TokenRefresh::new(keys.clone());
        let mut expired = Token::new(
            "1",
            OffsetDateTime::now_utc() - time::Duration::minutes(1),
        );
        expired
            .extra
            .insert(TOKEN_TYPE_CLAIM.into(), "refresh_token".into());
        let refresh_token = expired
            .encode(
                &EncodingKey::from_secret(SECRET.as_bytes()),
                keys.algorithm(),
                None,
            )
            .unwrap();
        let err = refresh
            .refresh(RefreshToken { refresh_token })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAuthorized(_)));
    }
}
