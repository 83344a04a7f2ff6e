use std::{sync::Arc, time::Duration};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    config::SimpleJwtConfig,
    token::{Token, TokenError, TOKEN_TYPE_CLAIM},
};

/// Which of the two configured token types to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Signing/verification keys derived from [`SimpleJwtConfig`], plus the
/// settings needed to issue and check tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    config: Arc<SimpleJwtConfig>,
}

impl JwtKeys {
    pub fn new(config: Arc<SimpleJwtConfig>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.signing_key.as_bytes()),
            decoding: DecodingKey::from_secret(config.signing_key.as_bytes()),
            config,
        }
    }

    pub fn config(&self) -> &SimpleJwtConfig {
        &self.config
    }

    pub fn algorithm(&self) -> Algorithm {
        self.config.algorithm
    }

    fn lifetime(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.config.access_token_lifetime,
            TokenKind::Refresh => self.config.refresh_token_lifetime,
        }
    }

    fn type_name(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.config.access_token_name,
            TokenKind::Refresh => &self.config.refresh_token_name,
        }
    }

    fn sign_with_kind(&self, subject: &str, kind: TokenKind) -> Result<String, TokenError> {
        let token = Token::with_lifetime(subject, self.lifetime(kind))?;
        let mut claims_extra = Map::new();
        claims_extra.insert(
            TOKEN_TYPE_CLAIM.into(),
            Value::String(self.type_name(kind).to_string()),
        );
        let encoded = token.encode(&self.encoding, self.algorithm(), Some(&claims_extra))?;
        debug!(sub = %subject, kind = ?kind, "jwt signed");
        Ok(encoded)
    }

    pub fn sign_access(&self, subject: &str) -> Result<String, TokenError> {
        self.sign_with_kind(subject, TokenKind::Access)
    }

    pub fn sign_refresh(&self, subject: &str) -> Result<String, TokenError> {
        self.sign_with_kind(subject, TokenKind::Refresh)
    }

    /// Check signature and expiry; the token type is not inspected.
    pub fn verify(&self, token: &str) -> Result<Token, TokenError> {
        let decoded = Token::decode(token, &self.decoding, self.algorithm(), self.config.leeway)?;
        debug!(sub = %decoded.sub, token_type = ?decoded.token_type(), "jwt verified");
        Ok(decoded)
    }

    /// Whether `token` carries the `token_type` of `kind`.
    pub fn is_kind(&self, token: &Token, kind: TokenKind) -> bool {
        token.token_type() == Some(self.type_name(kind))
    }
}
