use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    auth::{jwt::JwtKeys, repo::PgUserStore},
    config::AppConfig,
    extension::SimpleJwt,
};

/// State of the standalone server: the pool for host routes and the
/// extension state for sign-in/refresh.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub jwt: SimpleJwt,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        Self::from_parts(db, config)
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let jwt = SimpleJwt::with_store(config.jwt.clone(), PgUserStore::new(db.clone()))?;
        Ok(Self { db, config, jwt })
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.keys().clone()
    }
}
