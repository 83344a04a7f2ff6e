//! Signed JWT encoding and decoding.
//!
//! A [`Token`] carries the registered claims this crate issues (`sub`, `exp`,
//! `iat`, plus the optional `iss`, `aud`, `jti`) and a free-form map of extra
//! claims such as `token_type`. The codec is a thin layer over
//! [`jsonwebtoken`]; the signature is always checked before any claim is read.

use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};

/// Claims that extra claims may never shadow.
pub const REGISTERED_CLAIMS: [&str; 7] = ["sub", "exp", "iat", "nbf", "iss", "aud", "jti"];

/// Name of the claim distinguishing access from refresh tokens.
pub const TOKEN_TYPE_CLAIM: &str = "token_type";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("extra claim `{0}` collides with a registered claim")]
    ReservedClaim(String),
    #[error("token lifetime of {0:?} puts the expiry out of range")]
    LifetimeOutOfRange(Duration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Token {
    pub fn new(sub: impl Into<String>, exp: OffsetDateTime) -> Self {
        Self {
            sub: sub.into(),
            exp: exp.unix_timestamp(),
            iat: None,
            iss: None,
            aud: None,
            jti: None,
            extra: Map::new(),
        }
    }

    /// Token for `sub` issued now and expiring after `lifetime`.
    pub fn with_lifetime(sub: impl Into<String>, lifetime: Duration) -> Result<Self, TokenError> {
        let now = OffsetDateTime::now_utc();
        let exp = expiry_after(now, lifetime).ok_or(TokenError::LifetimeOutOfRange(lifetime))?;
        let mut token = Self::new(sub, exp);
        token.iat = Some(now.unix_timestamp());
        Ok(token)
    }

    pub fn token_type(&self) -> Option<&str> {
        self.extra.get(TOKEN_TYPE_CLAIM).and_then(Value::as_str)
    }

    /// Sign the token. `claims_extra` is merged over the token's own extra
    /// claims but may not name a registered claim.
    pub fn encode(
        &self,
        key: &EncodingKey,
        algorithm: Algorithm,
        claims_extra: Option<&Map<String, Value>>,
    ) -> Result<String, TokenError> {
        let mut token = self.clone();
        if let Some(extra) = claims_extra {
            for (name, value) in extra {
                if REGISTERED_CLAIMS.contains(&name.as_str()) {
                    return Err(TokenError::ReservedClaim(name.clone()));
                }
                token.extra.insert(name.clone(), value.clone());
            }
        }
        if let Some(name) = token
            .extra
            .keys()
            .find(|k| REGISTERED_CLAIMS.contains(&k.as_str()))
        {
            return Err(TokenError::ReservedClaim(name.clone()));
        }
        encode(&Header::new(algorithm), &token, key).map_err(TokenError::Encode)
    }

    /// Verify the signature and expiry of `token` and return its claims.
    pub fn decode(
        token: &str,
        key: &DecodingKey,
        algorithm: Algorithm,
        leeway: Duration,
    ) -> Result<Self, TokenError> {
        let mut validation = Validation::new(algorithm);
        validation.leeway = leeway.as_secs();
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        let data = decode::<Token>(token, key, &validation).map_err(TokenError::Invalid)?;
        Ok(data.claims)
    }
}

/// `now + lifetime`, or `None` when it is not a representable timestamp.
pub fn expiry_after(now: OffsetDateTime, lifetime: Duration) -> Option<OffsetDateTime> {
    let secs = i64::try_from(lifetime.as_secs()).ok()?;
    now.checked_add(TimeDuration::seconds(secs))
}
