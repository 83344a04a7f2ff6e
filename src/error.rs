use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::token::TokenError;

/// Detail returned for every failed sign-in, whatever check failed.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";
/// Detail returned for a refresh/bearer token that does not validate.
pub const INVALID_TOKEN: &str = "Invalid or expired token.";

/// Error surfaced by the controllers and the bearer extractor.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Any authentication or refresh failure. Rendered as 401.
    #[error("{0}")]
    NotAuthorized(String),
    /// Infrastructure failure (store, hasher, signer). Rendered as 500.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn invalid_credentials() -> Self {
        Self::NotAuthorized(INVALID_CREDENTIALS.into())
    }

    pub fn invalid_token() -> Self {
        Self::NotAuthorized(INVALID_TOKEN.into())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid(_) => Self::invalid_token(),
            other => Self::Internal(anyhow::Error::new(other)),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::NotAuthorized(detail) => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(json!({ "detail": detail })),
            )
                .into_response(),
            AuthError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal server error." })),
                )
                    .into_response()
            }
        }
    }
}

/// Invalid or missing settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("unsupported signing algorithm {0}; expected HS256, HS384 or HS512")]
    UnsupportedAlgorithm(String),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}
