//! Envelopes: the signed records that carry flow state across redirects.
//!
//! The service is stateless; everything a later phase needs is sealed into
//! one of these and travels through the client. Each envelope is a plain
//! serde struct; [`encode`] and [`decode`] do the JWT work against a codec
//! handle, so the types stay free of crypto plumbing.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::github::GitHubToken;
use crate::services::token_codec::{ClaimExpectations, TokenCodec, TokenError};

/// Lifetime of the state and authorization envelopes.
pub const ENVELOPE_TTL_SECS: i64 = 300;

/// Marker for records that serialize as signed JWT claims.
pub trait Envelope: Serialize + DeserializeOwned {}

/// Sign an envelope as a compact JWT.
pub fn encode<E: Envelope>(codec: &TokenCodec, envelope: &E) -> Result<String, TokenError> {
    codec.sign(envelope)
}

/// Verify a compact JWT and rebuild the envelope.
pub fn decode<E: Envelope>(
    codec: &TokenCodec,
    token: &str,
    expected: &ClaimExpectations,
) -> Result<E, TokenError> {
    let claims = codec.verify(token, expected)?;
    serde_json::from_value(claims).map_err(TokenError::from)
}

/// A 256-bit random claim so equal payloads never produce equal tokens.
fn fresh_randomizer() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// Carried from `/authorize` to the callback via GitHub's `state` parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEnvelope {
    /// The wrapped redirect URI bound at authorization time.
    pub redirect_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub randomizer: String,
}

impl StateEnvelope {
    pub fn new(
        redirect_uri: String,
        state: Option<String>,
        nonce: Option<String>,
        scopes: Vec<String>,
        referrer: Option<String>,
    ) -> Self {
        let now = Utc::now().timestamp();
        StateEnvelope {
            redirect_uri,
            state,
            nonce,
            scopes,
            referrer,
            iat: now,
            exp: now + ENVELOPE_TTL_SECS,
            randomizer: fresh_randomizer(),
        }
    }
}

impl Envelope for StateEnvelope {}

/// Handed to the relying party as its authorization `code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationEnvelope {
    /// The real GitHub authorization code.
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    pub scopes: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub randomizer: String,
}

impl AuthorizationEnvelope {
    pub fn new(
        code: String,
        redirect_uri: Option<String>,
        nonce: Option<String>,
        scopes: Vec<String>,
    ) -> Self {
        let now = Utc::now().timestamp();
        AuthorizationEnvelope {
            code,
            redirect_uri,
            nonce,
            scopes,
            iat: now,
            exp: now + ENVELOPE_TTL_SECS,
            randomizer: fresh_randomizer(),
        }
    }
}

impl Envelope for AuthorizationEnvelope {}

/// The confidential payload sealed inside the access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessInfo {
    /// GitHub's full token response.
    pub token: GitHubToken,
    /// OIDC scopes the token was granted with.
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// The outward access token: a signed envelope around an encrypted payload.
///
/// Anyone holding the JWKS can verify authenticity; only this service can
/// read the GitHub credential inside `token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenEnvelope {
    pub iss: String,
    /// The UserInfo endpoint URL.
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    /// [`AccessInfo`] as a compact JWE.
    pub token: String,
    pub randomizer: String,
}

impl AccessTokenEnvelope {
    pub fn new(iss: String, aud: String, iat: i64, exp: i64, token: String) -> Self {
        AccessTokenEnvelope {
            iss,
            aud,
            iat,
            exp,
            token,
            randomizer: fresh_randomizer(),
        }
    }
}

impl Envelope for AccessTokenEnvelope {}
