use axum::{extract::State, routing::post, Json, Router};
use tracing::{info, instrument};

use crate::{
    auth::dto::{AccessToken, Credentials, RefreshToken, TokenAccess},
    config::SimpleJwtConfig,
    error::AuthError,
    extension::SimpleJwt,
};

/// Sign-in and refresh routes at the configured paths.
pub fn auth_routes(config: &SimpleJwtConfig) -> Router<SimpleJwt> {
    Router::new()
        .route(&config.signin_url, post(signin))
        .route(&config.refresh_url, post(refresh))
}

/// Authenticate a user and return an access/refresh pair.
#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<SimpleJwt>,
    Json(payload): Json<Credentials>,
) -> Result<Json<TokenAccess>, AuthError> {
    let identifier = payload.identifier.clone();
    let tokens = state.authentication().authenticate(payload).await?;
    info!(identifier = %identifier, "user signed in");
    Ok(Json(tokens))
}

/// Exchange a refresh token for a new access token.
#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<SimpleJwt>,
    Json(payload): Json<RefreshToken>,
) -> Result<Json<AccessToken>, AuthError> {
    let access = state.refresh_backend().refresh(payload).await?;
    Ok(Json(access))
}
