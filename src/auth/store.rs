//! The user-store contract the authentication backend relies on.
//!
//! A store looks users up by identifier and exposes the password hasher so a
//! lookup miss can still pay for one hash. [`MemoryUserStore`] keeps users in
//! process; the Postgres store lives in [`super::repo`].

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::password::{hash_password, verify_password};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// A user as seen by the authentication backend.
#[async_trait]
pub trait UserRecord: Send + Sync {
    /// Becomes the `sub` claim.
    fn id(&self) -> String;

    fn is_active(&self) -> bool {
        true
    }

    async fn check_password(&self, plain: &str) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    type User: UserRecord;

    async fn get(&self, identifier: &str) -> Result<Self::User, StoreError>;

    /// Hash `plain` once with the store's hasher, discarding the result.
    async fn set_password(&self, plain: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct MemoryUser {
    pub id: String,
    pub identifier: String,
    pub password_hash: String,
    pub is_active: bool,
}

#[async_trait]
impl UserRecord for MemoryUser {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    async fn check_password(&self, plain: &str) -> anyhow::Result<bool> {
        verify_password(plain, &self.password_hash).await
    }
}

/// In-process user store keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<String, MemoryUser>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash `password` and register a user under `identifier`.
    pub async fn insert(
        &self,
        id: impl Into<String>,
        identifier: impl Into<String>,
        password: &str,
        is_active: bool,
    ) -> anyhow::Result<MemoryUser> {
        let password_hash = hash_password(password).await?;
        let user = MemoryUser {
            id: id.into(),
            identifier: identifier.into(),
            password_hash,
            is_active,
        };
        self.users
            .write()
            .await
            .insert(user.identifier.clone(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    type User = MemoryUser;

    async fn get(&self, identifier: &str) -> Result<MemoryUser, StoreError> {
        self.users
            .read()
            .await
            .get(identifier)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn set_password(&self, plain: &str) -> anyhow::Result<()> {
        hash_password(plain).await.map(|_| ())
    }
}
