//! Client authentication for the token and UserInfo endpoints.
//!
//! Credentials at `/token` arrive either as HTTP Basic or as form fields,
//! never both. The client secret is wrapped in `SecretString` the moment it
//! is read so it cannot leak through logs or debug output.

use actix_web::HttpRequest;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::SecretString;

use crate::error::{AppError, AppResult};

/// Resolved client credentials.
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Parse `Authorization: Basic <b64(user:pass)>`.
fn basic_credentials(req: &HttpRequest) -> Option<(String, String)> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Extract a Bearer token from the Authorization header.
pub fn bearer_token(req: &HttpRequest) -> Option<SecretString> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| SecretString::from(s.to_string()))
}

/// Resolve client credentials from HTTP Basic or form fields (exclusive-or).
pub fn resolve_client_credentials(
    req: &HttpRequest,
    form_client_id: Option<String>,
    form_client_secret: Option<String>,
) -> AppResult<ClientCredentials> {
    let basic = basic_credentials(req);

    if basic.is_some() && (form_client_id.is_some() || form_client_secret.is_some()) {
        return Err(AppError::InvalidRequest(
            "You cannot supply client credentials via both form fields and HTTP Basic \
             authentication at the same time"
                .to_string(),
        ));
    }

    let (client_id, client_secret) = match basic {
        Some((user, pass)) => (Some(user), Some(pass)),
        None => (form_client_id, form_client_secret),
    };

    let client_id =
        client_id.ok_or_else(|| AppError::InvalidRequest("Client ID is required".to_string()))?;
    let client_secret = client_secret
        .ok_or_else(|| AppError::InvalidRequest("Client secret is required".to_string()))?;

    Ok(ClientCredentials {
        client_id,
        client_secret: SecretString::from(client_secret),
    })
}

/// Whether a client ID is permitted. A list containing `*` matches everything.
pub fn client_is_allowed(client_id: &str, allowed_clients: &[String]) -> bool {
    allowed_clients
        .iter()
        .any(|allowed| allowed == "*" || allowed == client_id)
}
