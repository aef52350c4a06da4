//! Signed JWT and encrypted JWE handling.
//!
//! Signing is RS256, pinned. Encryption is compact JWE with `alg=dir` and
//! `enc=A256GCM`; the symmetric key is used directly, so the encrypted-key
//! segment is empty. All codec failures collapse into the opaque
//! [`TokenError`]; the HTTP status is the caller's decision.

use std::sync::Arc;

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::Nonce;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use jsonwebtoken::{Algorithm, Header, Validation, decode, encode};
use serde::Serialize;

use crate::services::keys::KeyMaterial;

/// JWE protected header for everything this service mints.
const JWE_HEADER: &str = r#"{"alg":"dir","enc":"A256GCM"}"#;

/// AES-GCM nonce size in bytes.
const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes.
const TAG_SIZE: usize = 16;

/// Clock skew tolerated when checking `iat`.
const IAT_LEEWAY_SECS: i64 = 60;

/// Opaque token failure. The reason is kept for server-side logs only.
#[derive(Debug, thiserror::Error)]
#[error("invalid token: {0}")]
pub struct TokenError(String);

impl TokenError {
    fn new(reason: impl Into<String>) -> Self {
        TokenError(reason.into())
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        TokenError(err.to_string())
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(err: serde_json::Error) -> Self {
        TokenError(format!("claims do not fit the envelope: {}", err))
    }
}

/// Exact-match claim constraints applied when verifying a JWT.
///
/// A set field is required to be present and equal (the "essential"
/// semantics). `exp` and `iat` are always checked.
#[derive(Debug, Clone, Default)]
pub struct ClaimExpectations {
    pub iss: Option<String>,
    pub aud: Option<String>,
}

/// Signs, verifies, encrypts, and decrypts compact tokens.
#[derive(Clone)]
pub struct TokenCodec {
    keys: Arc<KeyMaterial>,
}

impl TokenCodec {
    pub fn new(keys: Arc<KeyMaterial>) -> Self {
        TokenCodec { keys }
    }

    /// Sign a claims object as a compact RS256 JWT.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.keys.signing_kid().to_string());
        Ok(encode(&header, claims, self.keys.encoding_key())?)
    }

    /// Verify a compact JWT and return its claims.
    pub fn verify(
        &self,
        token: &str,
        expected: &ClaimExpectations,
    ) -> Result<serde_json::Value, TokenError> {
        let mut validation = Validation::new(Algorithm::RS256);
        if let Some(ref iss) = expected.iss {
            validation.set_issuer(&[iss]);
        }
        match expected.aud {
            Some(ref aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        let data = decode::<serde_json::Value>(token, self.keys.decoding_key(), &validation)?;

        // A token from the future is as invalid as an expired one.
        if let Some(iat) = data.claims.get("iat").and_then(|v| v.as_i64())
            && iat > Utc::now().timestamp() + IAT_LEEWAY_SECS
        {
            return Err(TokenError::new("iat is in the future"));
        }

        Ok(data.claims)
    }

    /// Encrypt a plaintext as a compact JWE (dir + A256GCM).
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, TokenError> {
        let header_b64 = URL_SAFE_NO_PAD.encode(JWE_HEADER);

        let nonce_bytes: [u8; NONCE_SIZE] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut ciphertext = self
            .keys
            .cipher()
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad: header_b64.as_bytes(),
                },
            )
            .map_err(|_| TokenError::new("encryption failed"))?;
        let tag = ciphertext.split_off(ciphertext.len() - TAG_SIZE);

        Ok(format!(
            "{}..{}.{}.{}",
            header_b64,
            URL_SAFE_NO_PAD.encode(nonce_bytes),
            URL_SAFE_NO_PAD.encode(&ciphertext),
            URL_SAFE_NO_PAD.encode(&tag),
        ))
    }

    /// Decrypt a compact JWE produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, token: &str) -> Result<Vec<u8>, TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 5 {
            return Err(TokenError::new("not a compact JWE"));
        }
        if !parts[1].is_empty() {
            return Err(TokenError::new("unexpected encrypted-key segment"));
        }

        let header_bytes = URL_SAFE_NO_PAD
            .decode(parts[0])
            .map_err(|_| TokenError::new("malformed JWE header"))?;
        let header: serde_json::Value = serde_json::from_slice(&header_bytes)
            .map_err(|_| TokenError::new("malformed JWE header"))?;
        if header.get("alg").and_then(|v| v.as_str()) != Some("dir")
            || header.get("enc").and_then(|v| v.as_str()) != Some("A256GCM")
        {
            return Err(TokenError::new("unsupported JWE algorithm"));
        }

        let nonce_bytes = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|_| TokenError::new("malformed JWE nonce"))?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(TokenError::new("malformed JWE nonce"));
        }

        let mut ciphertext = URL_SAFE_NO_PAD
            .decode(parts[3])
            .map_err(|_| TokenError::new("malformed JWE ciphertext"))?;
        let tag = URL_SAFE_NO_PAD
            .decode(parts[4])
            .map_err(|_| TokenError::new("malformed JWE tag"))?;
        if tag.len() != TAG_SIZE {
            return Err(TokenError::new("malformed JWE tag"));
        }
        ciphertext.extend_from_slice(&tag);

        self.keys
            .cipher()
            .decrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: &ciphertext,
                    aad: parts[0].as_bytes(),
                },
            )
            .map_err(|_| TokenError::new("decryption failed"))
    }
}
