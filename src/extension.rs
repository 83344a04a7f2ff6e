//! Mounting the sign-in/refresh routes into a host application.
//!
//! [`SimpleJwt`] is the state the controllers run against: the signing keys
//! and the two backends. [`SimpleJwtExtension`] turns it into a router that
//! can be nested under any prefix of a host [`Router`].

use std::sync::Arc;

use axum::{extract::FromRef, Router};
use tracing::info;

use crate::{
    auth::{
        backends::{AuthenticationBackend, RefreshBackend, StoreAuthentication, TokenRefresh},
        handlers::auth_routes,
        jwt::JwtKeys,
        store::UserStore,
    },
    config::{normalize_mount_path, SimpleJwtConfig},
    error::ConfigError,
};

#[derive(Clone)]
pub struct SimpleJwt {
    keys: JwtKeys,
    authentication: Arc<dyn AuthenticationBackend>,
    refresh: Arc<dyn RefreshBackend>,
}

impl SimpleJwt {
    pub fn new(
        keys: JwtKeys,
        authentication: Arc<dyn AuthenticationBackend>,
        refresh: Arc<dyn RefreshBackend>,
    ) -> Result<Self, ConfigError> {
        keys.config().validate()?;
        Ok(Self {
            keys,
            authentication,
            refresh,
        })
    }

    /// Stock backends: credentials checked against `store`, refresh by token.
    pub fn with_store<S: UserStore>(
        config: SimpleJwtConfig,
        store: S,
    ) -> Result<Self, ConfigError> {
        let keys = JwtKeys::new(Arc::new(config));
        Self::new(
            keys.clone(),
            Arc::new(StoreAuthentication::new(store, keys.clone())),
            Arc::new(TokenRefresh::new(keys)),
        )
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub fn authentication(&self) -> &dyn AuthenticationBackend {
        self.authentication.as_ref()
    }

    pub fn refresh_backend(&self) -> &dyn RefreshBackend {
        self.refresh.as_ref()
    }
}

impl FromRef<SimpleJwt> for JwtKeys {
    fn from_ref(state: &SimpleJwt) -> Self {
        state.keys.clone()
    }
}

pub struct SimpleJwtExtension {
    state: SimpleJwt,
}

impl SimpleJwtExtension {
    pub fn new(state: SimpleJwt) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &SimpleJwt {
        &self.state
    }

    /// The extension's routes with their state applied, ready to merge into
    /// a router of any state type.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        auth_routes(self.state.keys.config()).with_state(self.state.clone())
    }

    /// Register the routes on `app` under `path`. A missing leading `/` is
    /// added; an empty path or `/` merges them at the root.
    pub fn mount<S>(&self, app: Router<S>, path: &str) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let cfg = self.state.keys.config();
        let prefix = normalize_mount_path(path);
        info!(
            signin = %format!("{prefix}{}", cfg.signin_url),
            refresh = %format!("{prefix}{}", cfg.refresh_url),
            "simple-jwt routes registered"
        );
        if prefix.is_empty() {
            app.merge(self.router())
        } else {
            app.nest(&prefix, self.router())
        }
    }
}
