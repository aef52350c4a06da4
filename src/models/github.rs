//! GitHub API response models.

use serde::{Deserialize, Serialize};

/// GitHub user info from `GET /user`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
    pub updated_at: Option<String>,
}

/// GitHub organization from `GET /user/orgs`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubOrg {
    pub id: u64,
    pub login: String,
}

/// GitHub's token endpoint response, carried through opaquely.
///
/// No schema is imposed beyond the presence of `access_token`; GitHub is
/// free to add members without breaking sealed tokens already in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubToken(pub serde_json::Value);

impl GitHubToken {
    /// The bearer credential inside the token object.
    pub fn access_token(&self) -> Option<&str> {
        self.0.get("access_token").and_then(|v| v.as_str())
    }

    /// Whether GitHub reported an error instead of issuing a token.
    pub fn error(&self) -> Option<&str> {
        self.0.get("error").and_then(|v| v.as_str())
    }
}
