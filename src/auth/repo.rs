use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    password::{hash_password, verify_password},
    repo_types::User,
    store::{StoreError, UserRecord, UserStore},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Normalize an identifier: emails are trimmed and lowercased, usernames
/// only trimmed.
pub(crate) fn normalize_identifier(identifier: &str) -> (String, bool) {
    let trimmed = identifier.trim();
    if is_valid_email(trimmed) {
        (trimmed.to_lowercase(), true)
    } else {
        (trimmed.to_string(), false)
    }
}

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, is_active, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by username.
    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, is_active, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, is_active, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserRecord for User {
    fn id(&self) -> String {
        self.id.to_string()
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    async fn check_password(&self, plain: &str) -> anyhow::Result<bool> {
        verify_password(plain, &self.password_hash).await
    }
}

/// Users table in Postgres. Identifiers that look like an email are matched
/// on `email`, anything else on `username`.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    type User = User;

    async fn get(&self, identifier: &str) -> Result<User, StoreError> {
        let (identifier, is_email) = normalize_identifier(identifier);
        let user = if is_email {
            User::find_by_email(&self.db, &identifier).await?
        } else {
            User::find_by_username(&self.db, &identifier).await?
        };
        user.ok_or(StoreError::NotFound)
    }

    async fn set_password(&self, plain: &str) -> anyhow::Result<()> {
        hash_password(plain).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_lowercased() {
        assert_eq!(
            normalize_identifier("  Alice@Example.COM "),
            ("alice@example.com".to_string(), true)
        );
    }

    #[test]
    fn usernames_keep_case() {
        assert_eq!(normalize_identifier(" Alice "), ("Alice".to_string(), false));
    }
}
