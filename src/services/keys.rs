//! Key material: the RSA signing keypair and the AES-256-GCM sealing key.
//!
//! Source precedence: an operator-supplied keyset wins; otherwise keys are
//! loaded from the keys directory; otherwise they are generated and
//! persisted there. Generated keys are stored as single-key JWK sets.
//! An unreadable or corrupt key file is regenerated once; a second failure
//! is fatal at startup.

use std::path::Path;

use aes_gcm::aead::KeyInit;
use aes_gcm::{Aes256Gcm, Key};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Settings;

/// RSA modulus size in bits.
const RSA_KEY_BITS: usize = 2048;

/// Octet key size in bytes (256 bits for AES-256-GCM).
const OCT_KEY_SIZE: usize = 32;

const RSA_KEY_FILE: &str = "rsa_private_key.json";
const OCT_KEY_FILE: &str = "oct_private_key.json";

/// Key management errors.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("{0}")]
    InvalidKeyset(String),

    #[error("could not generate key material: {0}")]
    Generate(String),

    #[error("could not persist key material to {path}: {source}")]
    Persist {
        path: String,
        source: std::io::Error,
    },
}

/// A single JSON Web Key. Only the members this service uses are modeled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

/// A JWK set document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// A validated private keyset: one RSA signing key, one octet sealing key.
///
/// Construction goes through [`generate`](Self::generate) or
/// [`from_json`](Self::from_json), so holders can rely on the validation
/// rules having passed.
#[derive(Debug, Clone)]
pub struct KeySet {
    pub(crate) rsa: Jwk,
    pub(crate) oct: Jwk,
}

impl KeySet {
    /// Generate a fresh keyset.
    pub fn generate() -> Result<Self, KeyError> {
        Ok(KeySet {
            rsa: generate_rsa_jwk()?,
            oct: generate_oct_jwk(),
        })
    }

    /// Parse and validate an operator-supplied keyset JSON document.
    pub fn from_json(text: &str) -> Result<Self, KeyError> {
        let set: JwkSet = serde_json::from_str(text)
            .map_err(|e| KeyError::InvalidKeyset(format!("keyset is not valid JSON: {}", e)))?;

        if set.keys.len() != 2 {
            return Err(KeyError::InvalidKeyset(
                "custom private keysets must contain exactly two keys".to_string(),
            ));
        }

        let rsa = set
            .keys
            .iter()
            .find(|key| key.kty == "RSA")
            .cloned()
            .ok_or_else(|| {
                KeyError::InvalidKeyset(
                    "custom private keysets must contain an RSA key".to_string(),
                )
            })?;

        let oct = set
            .keys
            .iter()
            .find(|key| key.kty == "oct")
            .cloned()
            .ok_or_else(|| {
                KeyError::InvalidKeyset(
                    "custom private keysets must contain an octet sequence key".to_string(),
                )
            })?;

        validate_rsa_jwk(&rsa)?;
        validate_oct_jwk(&oct)?;

        Ok(KeySet { rsa, oct })
    }

    /// The private keyset as a JWK set document.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "keys": [self.rsa, self.oct] })
    }
}

fn validate_rsa_jwk(jwk: &Jwk) -> Result<(), KeyError> {
    if jwk.alg.as_deref() != Some("RS256") {
        return Err(KeyError::InvalidKeyset(
            "the RSA key in a custom private keyset must be an RS256 key".to_string(),
        ));
    }
    if jwk.use_.as_deref() != Some("sig") {
        return Err(KeyError::InvalidKeyset(
            "the RSA key in a custom private keyset must support signing".to_string(),
        ));
    }
    if jwk.d.is_none() || jwk.p.is_none() || jwk.q.is_none() {
        return Err(KeyError::InvalidKeyset(
            "the RSA key in a custom private keyset must be a private key".to_string(),
        ));
    }
    if jwk.n.is_none() || jwk.e.is_none() {
        return Err(KeyError::InvalidKeyset(
            "the RSA key in a custom private keyset is missing its public members".to_string(),
        ));
    }
    Ok(())
}

fn validate_oct_jwk(jwk: &Jwk) -> Result<(), KeyError> {
    if jwk.alg.as_deref() != Some("A256GCM") {
        return Err(KeyError::InvalidKeyset(
            "the octet sequence key in a custom private keyset must be an A256GCM key".to_string(),
        ));
    }
    if jwk.use_.as_deref() != Some("enc") {
        return Err(KeyError::InvalidKeyset(
            "the octet sequence key in a custom private keyset must support encryption"
                .to_string(),
        ));
    }
    let k = jwk.k.as_deref().ok_or_else(|| {
        KeyError::InvalidKeyset(
            "the octet sequence key in a custom private keyset is missing its key value"
                .to_string(),
        )
    })?;
    let bytes = URL_SAFE_NO_PAD
        .decode(k)
        .map_err(|_| KeyError::InvalidKeyset("the octet sequence key is not base64url".into()))?;
    if bytes.len() != OCT_KEY_SIZE {
        return Err(KeyError::InvalidKeyset(
            "the octet sequence key in a custom private keyset must be 256 bits".to_string(),
        ));
    }
    Ok(())
}

fn generate_rsa_jwk() -> Result<Jwk, KeyError> {
    use rsa::rand_core::OsRng;

    let private_key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
        .map_err(|e| KeyError::Generate(format!("RSA key generation failed: {}", e)))?;

    let n = URL_SAFE_NO_PAD.encode(private_key.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(private_key.e().to_bytes_be());
    let d = URL_SAFE_NO_PAD.encode(private_key.d().to_bytes_be());
    let primes = private_key.primes();
    let p = URL_SAFE_NO_PAD.encode(primes[0].to_bytes_be());
    let q = URL_SAFE_NO_PAD.encode(primes[1].to_bytes_be());

    Ok(Jwk {
        kty: "RSA".to_string(),
        use_: Some("sig".to_string()),
        alg: Some("RS256".to_string()),
        kid: Some(rsa_thumbprint(&e, &n)),
        n: Some(n),
        e: Some(e),
        d: Some(d),
        p: Some(p),
        q: Some(q),
        k: None,
    })
}

fn generate_oct_jwk() -> Jwk {
    let key_bytes: [u8; OCT_KEY_SIZE] = rand::random();
    let k = URL_SAFE_NO_PAD.encode(key_bytes);

    Jwk {
        kty: "oct".to_string(),
        use_: Some("enc".to_string()),
        alg: Some("A256GCM".to_string()),
        kid: Some(oct_thumbprint(&k)),
        n: None,
        e: None,
        d: None,
        p: None,
        q: None,
        k: Some(k),
    }
}

/// RFC 7638 thumbprint of an RSA public key.
fn rsa_thumbprint(e: &str, n: &str) -> String {
    let canonical = format!(r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#, e, n);
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}

/// RFC 7638 thumbprint of an octet key.
fn oct_thumbprint(k: &str) -> String {
    let canonical = format!(r#"{{"k":"{}","kty":"oct"}}"#, k);
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}

/// Loaded cryptographic material, shared for the process lifetime.
#[derive(Clone)]
pub struct KeyMaterial {
    signing_kid: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public_jwks: serde_json::Value,
    cipher: Aes256Gcm,
}

impl KeyMaterial {
    /// Build key material per the source precedence.
    pub fn load_or_generate(settings: &Settings) -> Result<Self, KeyError> {
        if let Some(keyset) = &settings.keyset {
            return Self::from_keyset(keyset);
        }

        let rsa = load_or_create_key(&settings.keys_dir, RSA_KEY_FILE, || {
            generate_rsa_jwk().map(|jwk| (jwk, "RSA"))
        })?;
        let oct = load_or_create_key(&settings.keys_dir, OCT_KEY_FILE, || {
            Ok((generate_oct_jwk(), "oct"))
        })?;

        let keyset = KeySet::from_json(
            &serde_json::json!({ "keys": [rsa, oct] }).to_string(),
        )?;
        Self::from_keyset(&keyset)
    }

    /// Construct crypto handles from a validated keyset.
    pub fn from_keyset(keyset: &KeySet) -> Result<Self, KeyError> {
        let rsa = &keyset.rsa;
        let n_b64 = rsa.n.as_deref().expect("validated RSA key has n");
        let e_b64 = rsa.e.as_deref().expect("validated RSA key has e");

        let n = decode_biguint(n_b64)?;
        let e = decode_biguint(e_b64)?;
        let d = decode_biguint(rsa.d.as_deref().expect("validated RSA key has d"))?;
        let p = decode_biguint(rsa.p.as_deref().expect("validated RSA key has p"))?;
        let q = decode_biguint(rsa.q.as_deref().expect("validated RSA key has q"))?;

        let private_key = RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|e| KeyError::InvalidKeyset(format!("RSA key is not usable: {}", e)))?;

        let pem = private_key
            .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
            .map_err(|e| KeyError::Generate(format!("failed to encode private key: {}", e)))?;
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| KeyError::Generate(format!("failed to create signing key: {}", e)))?;
        let decoding_key = DecodingKey::from_rsa_components(n_b64, e_b64)
            .map_err(|e| KeyError::Generate(format!("failed to create verifying key: {}", e)))?;

        let signing_kid = rsa
            .kid
            .clone()
            .unwrap_or_else(|| rsa_thumbprint(e_b64, n_b64));

        // Only the RSA public half is published.
        let public_jwks = serde_json::json!({
            "keys": [{
                "kty": "RSA",
                "n": n_b64,
                "e": e_b64,
                "use": "sig",
                "alg": "RS256",
                "kid": signing_kid,
            }]
        });

        let oct_bytes = URL_SAFE_NO_PAD
            .decode(keyset.oct.k.as_deref().expect("validated oct key has k"))
            .map_err(|_| KeyError::InvalidKeyset("octet key is not base64url".to_string()))?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&oct_bytes));

        Ok(KeyMaterial {
            signing_kid,
            encoding_key,
            decoding_key,
            public_jwks,
            cipher,
        })
    }

    /// Key ID placed in signed JWT headers.
    pub fn signing_kid(&self) -> &str {
        &self.signing_kid
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    pub fn cipher(&self) -> &Aes256Gcm {
        &self.cipher
    }

    /// The public JWKS document.
    pub fn public_jwks(&self) -> &serde_json::Value {
        &self.public_jwks
    }
}

fn decode_biguint(b64: &str) -> Result<BigUint, KeyError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(b64)
        .map_err(|_| KeyError::InvalidKeyset("RSA key member is not base64url".to_string()))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Read a single-key JWK set file, regenerating it when missing or corrupt.
fn load_or_create_key(
    dir: &Path,
    file_name: &str,
    generate: impl Fn() -> Result<(Jwk, &'static str), KeyError>,
) -> Result<Jwk, KeyError> {
    let path = dir.join(file_name);

    if let Ok(text) = std::fs::read_to_string(&path)
        && let Ok(set) = serde_json::from_str::<JwkSet>(&text)
        && let Some(jwk) = set.keys.into_iter().next()
    {
        return Ok(jwk);
    }

    let (jwk, kind) = generate()?;
    tracing::info!("generated a new {} key at {}", kind, path.display());

    std::fs::create_dir_all(dir).map_err(|source| KeyError::Persist {
        path: dir.display().to_string(),
        source,
    })?;
    let document = serde_json::json!({ "keys": [jwk] });
    std::fs::write(&path, document.to_string()).map_err(|source| KeyError::Persist {
        path: path.display().to_string(),
        source,
    })?;

    Ok(jwk)
}
