//! Wire models for endpoint responses.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `POST /token` response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    pub expires_at: i64,
    pub id_token: String,
}

/// `GET /userinfo` response. Only `sub` is guaranteed; everything else is
/// gated on the scopes the token was granted with.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserInfoResponse {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}

/// A published JSON Web Key (RSA public half).
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicJwk {
    pub kty: String,
    pub n: String,
    pub e: String,
    #[serde(rename = "use")]
    pub use_: String,
    pub alg: String,
    pub kid: String,
}

/// `GET /.well-known/jwks.json` response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JwksDocument {
    pub keys: Vec<PublicJwk>,
}

/// A WebFinger link.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebFingerLink {
    pub rel: String,
    pub href: String,
}

/// `GET /.well-known/webfinger` response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebFingerResponse {
    pub subject: String,
    pub links: Vec<WebFingerLink>,
}

/// `GET /.well-known/openid-configuration` response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub jwks_uri: String,
    pub claims_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub response_types_supported: Vec<String>,
    pub subject_types_supported: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub code_challenge_methods_supported: Vec<String>,
}

impl DiscoveryDocument {
    /// Build the discovery document for a base URL (no trailing slash).
    pub fn for_base_url(base: &str) -> Self {
        DiscoveryDocument {
            issuer: format!("{}/", base),
            authorization_endpoint: format!("{}/authorize", base),
            token_endpoint: format!("{}/token", base),
            userinfo_endpoint: format!("{}/userinfo", base),
            jwks_uri: format!("{}/.well-known/jwks.json", base),
            claims_supported: to_strings(&[
                "sub",
                "preferred_username",
                "name",
                "nickname",
                "locale",
                "picture",
                "profile",
                "updated_at",
                "email",
                "email_verified",
                "groups",
            ]),
            grant_types_supported: to_strings(&["authorization_code"]),
            id_token_signing_alg_values_supported: to_strings(&["RS256"]),
            token_endpoint_auth_methods_supported: to_strings(&[
                "client_secret_basic",
                "client_secret_post",
            ]),
            response_types_supported: to_strings(&["code"]),
            subject_types_supported: to_strings(&["public"]),
            scopes_supported: to_strings(&["openid", "profile", "email", "groups"]),
            code_challenge_methods_supported: to_strings(&["S256"]),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
