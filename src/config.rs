use std::time::Duration;

use jsonwebtoken::Algorithm;
use time::OffsetDateTime;

use crate::{error::ConfigError, token::expiry_after};

const DEFAULT_ACCESS_TTL_MINUTES: u64 = 5;
const DEFAULT_REFRESH_TTL_MINUTES: u64 = 60 * 24;
const MAX_LEEWAY: Duration = Duration::from_secs(60 * 60 * 24);

/// Settings for token issuance and the routes the extension exposes.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct SimpleJwtConfig {
    pub signing_key: String,
    pub algorithm: Algorithm,
    pub access_token_lifetime: Duration,
    pub refresh_token_lifetime: Duration,
    /// Value of the `token_type` claim on access tokens.
    pub access_token_name: String,
    /// Value of the `token_type` claim on refresh tokens.
    pub refresh_token_name: String,
    /// Clock skew tolerated when checking `exp`.
    pub leeway: Duration,
    pub signin_url: String,
    pub refresh_url: String,
    pub authorization_header: String,
    /// Accepted schemes in the authorization header, e.g. `Bearer`.
    pub auth_header_types: Vec<String>,
}

impl SimpleJwtConfig {
    pub fn new(signing_key: impl Into<String>) -> Self {
        Self {
            signing_key: signing_key.into(),
            algorithm: Algorithm::HS256,
            access_token_lifetime: Duration::from_secs(DEFAULT_ACCESS_TTL_MINUTES * 60),
            refresh_token_lifetime: Duration::from_secs(DEFAULT_REFRESH_TTL_MINUTES * 60),
            access_token_name: "access_token".into(),
            refresh_token_name: "refresh_token".into(),
            leeway: Duration::ZERO,
            signin_url: "/signin".into(),
            refresh_url: "/refresh-access".into(),
            authorization_header: "Authorization".into(),
            auth_header_types: vec!["Bearer".into()],
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source. Unset variables
    /// fall back to defaults; set but malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let mut cfg = Self::new(secret);

        if let Some(alg) = lookup("JWT_ALGORITHM") {
            cfg.algorithm = parse_algorithm(&alg)?;
        }
        if let Some(v) = lookup("JWT_ACCESS_TTL_MINUTES") {
            cfg.access_token_lifetime = minutes("JWT_ACCESS_TTL_MINUTES", &v)?;
        }
        if let Some(v) = lookup("JWT_REFRESH_TTL_MINUTES") {
            cfg.refresh_token_lifetime = minutes("JWT_REFRESH_TTL_MINUTES", &v)?;
        }
        if let Some(v) = lookup("JWT_LEEWAY_SECONDS") {
            let secs = v
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::invalid("JWT_LEEWAY_SECONDS", e.to_string()))?;
            cfg.leeway = Duration::from_secs(secs);
        }
        if let Some(v) = lookup("JWT_ACCESS_TOKEN_NAME") {
            cfg.access_token_name = v;
        }
        if let Some(v) = lookup("JWT_REFRESH_TOKEN_NAME") {
            cfg.refresh_token_name = v;
        }
        if let Some(v) = lookup("JWT_SIGNIN_URL") {
            cfg.signin_url = v;
        }
        if let Some(v) = lookup("JWT_REFRESH_URL") {
            cfg.refresh_url = v;
        }
        if let Some(v) = lookup("JWT_AUTHORIZATION_HEADER") {
            cfg.authorization_header = v;
        }
        if let Some(v) = lookup("JWT_AUTH_HEADER_TYPES") {
            cfg.auth_header_types = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_key.is_empty() {
            return Err(ConfigError::invalid("signing_key", "must not be empty"));
        }
        if !matches!(
            self.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::UnsupportedAlgorithm(format!(
                "{:?}",
                self.algorithm
            )));
        }
        if self.access_token_lifetime.as_secs() == 0 {
            return Err(ConfigError::invalid(
                "access_token_lifetime",
                "must be at least one second",
            ));
        }
        if expiry_after(OffsetDateTime::now_utc(), self.refresh_token_lifetime).is_none() {
            return Err(ConfigError::invalid(
                "refresh_token_lifetime",
                "expiry would be past the latest representable date",
            ));
        }
        if self.leeway > MAX_LEEWAY {
            return Err(ConfigError::invalid("leeway", "must not exceed one day"));
        }
        if self.refresh_token_lifetime < self.access_token_lifetime {
            return Err(ConfigError::invalid(
                "refresh_token_lifetime",
                "must not be shorter than the access token lifetime",
            ));
        }
        for (name, value) in [
            ("access_token_name", &self.access_token_name),
            ("refresh_token_name", &self.refresh_token_name),
        ] {
            if value.is_empty() {
                return Err(ConfigError::invalid(name, "must not be empty"));
            }
        }
        if self.access_token_name == self.refresh_token_name {
            return Err(ConfigError::invalid(
                "refresh_token_name",
                "must differ from access_token_name",
            ));
        }
        for (name, url) in [
            ("signin_url", &self.signin_url),
            ("refresh_url", &self.refresh_url),
        ] {
            if !url.starts_with('/') {
                return Err(ConfigError::invalid(name, "must start with '/'"));
            }
        }
        if self.signin_url == self.refresh_url {
            return Err(ConfigError::invalid(
                "refresh_url",
                "must differ from signin_url",
            ));
        }
        if self.authorization_header.is_empty() {
            return Err(ConfigError::invalid(
                "authorization_header",
                "must not be empty",
            ));
        }
        if self.auth_header_types.is_empty() {
            return Err(ConfigError::invalid(
                "auth_header_types",
                "at least one header type is required",
            ));
        }
        Ok(())
    }
}

fn parse_algorithm(raw: &str) -> Result<Algorithm, ConfigError> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(ConfigError::UnsupportedAlgorithm(other.to_string())),
    }
}

fn minutes(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let m = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::invalid(name, e.to_string()))?;
    let secs = m
        .checked_mul(60)
        .ok_or_else(|| ConfigError::invalid(name, "out of range"))?;
    Ok(Duration::from_secs(secs))
}

/// Router prefix with exactly one leading `/` and no trailing one; the root
/// is the empty string.
pub fn normalize_mount_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Settings of the standalone server binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Path the sign-in/refresh routes are mounted under.
    pub mount_path: String,
    pub jwt: SimpleJwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let mount_path = std::env::var("SIMPLE_JWT_PATH")
            .map(|p| normalize_mount_path(&p))
            .unwrap_or_else(|_| "/auth".into());
        let jwt = SimpleJwtConfig::from_env()?;
        Ok(Self {
            database_url,
            mount_path,
            jwt,
        })
    }
}
