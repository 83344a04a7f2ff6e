use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::jwt::{JwtKeys, TokenKind};
use crate::{error::AuthError, token::Token};

/// Validated access token taken from the configured authorization header.
///
/// Host routes use this to require a signed-in user; refresh tokens are
/// refused here.
pub struct BearerToken(pub Token);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let cfg = keys.config();

        let header = parts
            .headers
            .get(cfg.authorization_header.as_str())
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AuthError::NotAuthorized("Missing authorization header.".into()))?;

        let raw = cfg
            .auth_header_types
            .iter()
            .find_map(|scheme| {
                header
                    .strip_prefix(scheme.as_str())
                    .and_then(|rest| rest.strip_prefix(' '))
            })
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::NotAuthorized("Invalid authorization scheme.".into()))?;

        let token = keys.verify(raw).map_err(|e| {
            warn!(error = %e, "invalid or expired bearer token");
            AuthError::invalid_token()
        })?;

        if !keys.is_kind(&token, TokenKind::Access) {
            return Err(AuthError::NotAuthorized("Access token required.".into()));
        }

        Ok(BearerToken(token))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{header::AUTHORIZATION, Request};

    use super::*;
    use crate::config::SimpleJwtConfig;

    fn keys() -> JwtKeys {
        let mut cfg = SimpleJwtConfig::new("extractor-secret");
        cfg.auth_header_types = vec!["Bearer".into(), "JWT".into()];
        JwtKeys::new(Arc::new(cfg))
    }

    async fn extract(keys: &JwtKeys, header: Option<String>) -> Result<BearerToken, AuthError> {
        let mut builder = Request::builder().uri("/me");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        BearerToken::from_request_parts(&mut parts, keys).await
    }

    #[tokio::test]
    async fn accepts_access_token_under_any_configured_scheme() {
        let keys = keys();
        let token = keys.sign_access("5").unwrap();
        let BearerToken(claims) = extract(&keys, Some(format!("Bearer {token}")))
            .await
            .unwrap();
        assert_eq!(claims.sub, "5");
        assert!(extract(&keys, Some(format!("JWT {token}"))).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_missing_header_and_unknown_scheme() {
        let keys = keys();
        let token = keys.sign_access("5").unwrap();
        assert!(extract(&keys, None).await.is_err());
        assert!(extract(&keys, Some(format!("Basic {token}"))).await.is_err());
        assert!(extract(&keys, Some("Bearer ".into())).await.is_err());
    }

    #[tokio::test]
    async fn rejects_refresh_token() {
        let keys = keys();
        let token = keys.sign_refresh("5").unwrap();
        let err = extract(&keys, Some(format!("Bearer {token}")))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AuthError::NotAuthorized(d) if d == "Access token required."));
    }
}
