//! Token minting: identity claims, the sealed access token, and the ID token.
//!
//! `/token` and `/userinfo` share this pipeline; the only differences are
//! whether a nonce and an audience are known.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::models::envelopes::{self, AccessInfo, AccessTokenEnvelope};
use crate::models::github::{GitHubOrg, GitHubToken, GitHubUser};
use crate::models::responses::TokenResponse;
use crate::services::github::GitHubClient;
use crate::services::token_codec::TokenCodec;

/// The minted pair plus the raw ID-token claims (`/userinfo` returns those).
pub struct MintedTokens {
    pub tokens: TokenResponse,
    pub identity_claims: Map<String, Value>,
}

/// When no lifetime is configured, tokens carry this expiry. JWTs must have
/// an `exp`, so this is the closest thing to a token that never expires.
fn far_future() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .expect("sentinel timestamp is valid")
        + chrono::Duration::microseconds(999_999)
}

/// Mint an access token and ID token for a GitHub token.
#[allow(clippy::too_many_arguments)]
pub async fn create_tokens(
    github: &GitHubClient,
    codec: &TokenCodec,
    settings: &Settings,
    issuer: &str,
    userinfo_endpoint: &str,
    client_id: Option<&str>,
    github_token: GitHubToken,
    scopes: &[String],
    nonce: Option<&str>,
) -> AppResult<MintedTokens> {
    let user = github.get_user(&github_token).await?;

    // Organizations are only fetched when the groups claim can appear.
    let orgs = if scopes.iter().any(|s| s == "groups") {
        Some(github.get_orgs(&github_token).await?)
    } else {
        None
    };

    let now = Utc::now();
    let expiry = match settings.token_lifetime {
        Some(lifetime) => chrono::Duration::from_std(lifetime)
            .map(|lifetime| now + lifetime)
            .unwrap_or_else(|_| far_future()),
        None => far_future(),
    };

    let identity_claims = build_identity_claims(
        &user,
        orgs.as_deref(),
        scopes,
        issuer,
        client_id,
        now,
        expiry,
        nonce,
    );

    let access_info = AccessInfo {
        token: github_token,
        scopes: scopes.to_vec(),
        client_id: None,
        client_secret: None,
    };
    let sealed = codec
        .encrypt(&serde_json::to_vec(&access_info)?)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let envelope = AccessTokenEnvelope::new(
        issuer.to_string(),
        userinfo_endpoint.to_string(),
        now.timestamp(),
        expiry.timestamp(),
        sealed,
    );
    let access_token = envelopes::encode(codec, &envelope)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let id_token = codec
        .sign(&identity_claims)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(MintedTokens {
        tokens: TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_at: expiry.timestamp(),
            id_token,
        },
        identity_claims,
    })
}

/// Derive ID-token claims from a GitHub profile, gated on granted scopes.
#[allow(clippy::too_many_arguments)]
pub fn build_identity_claims(
    user: &GitHubUser,
    orgs: Option<&[GitHubOrg]>,
    scopes: &[String],
    issuer: &str,
    client_id: Option<&str>,
    now: DateTime<Utc>,
    expiry: DateTime<Utc>,
    nonce: Option<&str>,
) -> Map<String, Value> {
    let has = |scope: &str| scopes.iter().any(|s| s == scope);

    let mut claims = Map::new();
    claims.insert("iss".to_string(), Value::String(issuer.to_string()));
    if let Some(client_id) = client_id {
        claims.insert("aud".to_string(), Value::String(client_id.to_string()));
    }
    claims.insert("iat".to_string(), Value::from(now.timestamp()));
    claims.insert("exp".to_string(), Value::from(expiry.timestamp()));
    claims.insert("sub".to_string(), Value::String(user.id.to_string()));

    if has("profile") {
        claims.insert(
            "preferred_username".to_string(),
            Value::String(user.login.clone()),
        );
        if let Some(ref name) = user.name {
            claims.insert("name".to_string(), Value::String(name.clone()));
            claims.insert("nickname".to_string(), Value::String(name.clone()));
        }
        if let Some(ref avatar_url) = user.avatar_url {
            claims.insert("picture".to_string(), Value::String(avatar_url.clone()));
        }
        if let Some(ref html_url) = user.html_url {
            claims.insert("profile".to_string(), Value::String(html_url.clone()));
        }
        if let Some(updated_at) = user
            .updated_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        {
            claims.insert("updated_at".to_string(), Value::from(updated_at.timestamp()));
        }
    }

    if has("email")
        && let Some(ref email) = user.email
    {
        claims.insert("email".to_string(), Value::String(email.clone()));
        claims.insert("email_verified".to_string(), Value::Bool(true));
    }

    if has("groups")
        && let Some(orgs) = orgs
        && !orgs.is_empty()
    {
        let groups: Vec<Value> = orgs
            .iter()
            .map(|org| Value::String(org.id.to_string()))
            .collect();
        claims.insert("groups".to_string(), Value::Array(groups));
    }

    if let Some(nonce) = nonce {
        claims.insert("nonce".to_string(), Value::String(nonce.to_string()));
    }

    claims
}
