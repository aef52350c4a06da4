//! Client for GitHub's OAuth2 authorization server and REST API.

use actix_web::http::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::models::github::{GitHubOrg, GitHubToken, GitHubUser};

/// GitHub's OAuth2 authorization endpoint.
pub const AUTHORIZE_ENDPOINT: &str = "https://github.com/login/oauth/authorize";

/// GitHub's OAuth2 token endpoint.
pub const TOKEN_ENDPOINT: &str = "https://github.com/login/oauth/access_token";

/// GitHub's REST API base.
pub const API_BASE: &str = "https://api.github.com";

/// User agent sent on every GitHub request.
const USER_AGENT: &str = "takagi";

/// HTTP connect timeout for GitHub calls.
const HTTP_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// HTTP total timeout for GitHub calls.
const HTTP_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// GitHub OAuth2 / REST client. Cheap to clone; construct once at startup.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    authorize_endpoint: String,
    token_endpoint: String,
    api_base: String,
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubClient {
    pub fn new() -> Self {
        Self::with_endpoints(AUTHORIZE_ENDPOINT, TOKEN_ENDPOINT, API_BASE)
    }

    /// Construct against alternate endpoints. Tests point this at a local
    /// fixture server.
    pub fn with_endpoints(authorize_endpoint: &str, token_endpoint: &str, api_base: &str) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client for GitHub");

        GitHubClient {
            http,
            authorize_endpoint: authorize_endpoint.to_string(),
            token_endpoint: token_endpoint.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Build the authorization redirect URL from ordered query parameters.
    pub fn authorization_url(&self, params: &[(String, String)]) -> String {
        let query = params
            .iter()
            .map(|(k, v)| {
                format!("{}={}", urlencoding::encode(k), urlencoding::encode(v))
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.authorize_endpoint, query)
    }

    /// Exchange an authorization code for a GitHub token.
    ///
    /// Client credentials are attached via HTTP Basic. `form` carries the
    /// grant parameters (`grant_type`, `code`, `redirect_uri`, anything the
    /// relying party forwarded).
    pub async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &SecretString,
        form: &[(String, String)],
    ) -> AppResult<GitHubToken> {
        let response = self
            .http
            .post(&self.token_endpoint)
            .basic_auth(client_id, Some(client_secret.expose_secret()))
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .form(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(upstream_error(status.as_u16(), body));
        }

        let token = GitHubToken(body);
        // GitHub reports grant failures with a 200 and an error member.
        if token.error().is_some() {
            warn!("GitHub rejected the code exchange: {:?}", token.error());
            return Err(AppError::Upstream {
                status: StatusCode::BAD_REQUEST,
                body: token.0,
            });
        }

        Ok(token)
    }

    /// `GET /user` for the token's owner.
    pub async fn get_user(&self, token: &GitHubToken) -> AppResult<GitHubUser> {
        self.api_get("/user", token).await
    }

    /// `GET /user/orgs` for the token's owner.
    pub async fn get_orgs(&self, token: &GitHubToken) -> AppResult<Vec<GitHubOrg>> {
        self.api_get("/user/orgs", token).await
    }

    async fn api_get<T: DeserializeOwned>(&self, path: &str, token: &GitHubToken) -> AppResult<T> {
        let access_token = token
            .access_token()
            .ok_or_else(|| AppError::Internal("GitHub token has no access_token".to_string()))?;

        let response = self
            .http
            .get(format!("{}{}", self.api_base, path))
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response
                .json()
                .await
                .unwrap_or_else(|_| serde_json::json!({"message": "unreadable GitHub response"}));
            return Err(upstream_error(status.as_u16(), body));
        }

        response.json::<T>().await.map_err(transport_error)
    }
}

fn transport_error(err: reqwest::Error) -> AppError {
    warn!("GitHub request failed: {}", err);
    AppError::Upstream {
        status: StatusCode::BAD_GATEWAY,
        body: serde_json::json!({"message": format!("GitHub is unreachable: {}", err)}),
    }
}

/// Re-raise GitHub's status and JSON body to the relying party.
fn upstream_error(status: u16, body: serde_json::Value) -> AppError {
    AppError::Upstream {
        status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
        body,
    }
}
