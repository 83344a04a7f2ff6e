use serde::{Deserialize, Serialize};

/// Request body for sign-in. `email` and `username` are accepted as
/// spellings of `identifier`.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(alias = "email", alias = "username")]
    pub identifier: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Request body for token refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshToken {
    pub refresh_token: String,
}

/// Returned once at sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenAccess {
    pub access_token: String,
    pub refresh_token: String,
}

/// Returned by refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
}
