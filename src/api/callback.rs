//! The callback endpoint GitHub redirects back to.

use actix_web::{HttpRequest, HttpResponse, get, web};

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::models::envelopes::{self, AuthorizationEnvelope, StateEnvelope};
use crate::services::redirect::{callback_base, fix_redirect_uri};
use crate::services::token_codec::{ClaimExpectations, TokenCodec};

/// The callback mount point itself is not a resource.
#[get("/r")]
pub async fn redirect_root() -> AppResult<HttpResponse> {
    Err(AppError::NotFound("Not Found".to_string()))
}

/// Receive GitHub's redirect and forward the browser to the relying party.
///
/// The path tail is the relying party's original redirect URI; `state` is
/// the envelope sealed at `/authorize`. The real GitHub code is swapped for
/// an authorization envelope before it reaches the relying party.
#[utoipa::path(
    get,
    path = "/r/{redirect_uri}",
    tag = "OpenID Connect",
    params(
        ("redirect_uri" = String, Path, description = "The relying party's original redirect URI"),
        ("state" = String, Query, description = "The signed state produced at authorization"),
        ("code" = Option<String>, Query, description = "GitHub's authorization code"),
        ("error" = Option<String>, Query, description = "GitHub's error code, if authorization failed"),
    ),
    responses(
        (status = 302, description = "Redirect to the relying party"),
        (status = 400, description = "Invalid or mismatching state", body = crate::error::ErrorDetail)
    )
)]
#[get("/r/{redirect_uri:.*}")]
pub async fn callback(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<Vec<(String, String)>>,
    settings: web::Data<Settings>,
    codec: web::Data<TokenCodec>,
) -> AppResult<HttpResponse> {
    let redirect_uri = path.into_inner();
    let params = query.into_inner();

    let state_jwt = params
        .iter()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.as_str())
        .ok_or(AppError::MismatchingState)?;

    let envelope: StateEnvelope =
        envelopes::decode(&codec, state_jwt, &ClaimExpectations::default())
            .map_err(|_| AppError::MismatchingState)?;

    let code = params
        .iter()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.clone());
    let error = params
        .iter()
        .find(|(key, _)| key == "error")
        .map(|(_, value)| value.clone());

    if error.as_deref() == Some("access_denied")
        && settings.return_to_referrer
        && let Some(ref referrer) = envelope.referrer
    {
        return Ok(HttpResponse::Found()
            .append_header(("Location", referrer.clone()))
            .finish());
    }

    let callback = callback_base(&req, &settings);
    if fix_redirect_uri(&redirect_uri, &callback) != envelope.redirect_uri {
        return Err(AppError::InvalidRequest(
            "Redirect URI does not match what was sent at authorization".to_string(),
        ));
    }

    // Rebuild the relying party's URL: drop our state, restore theirs, and
    // swap the GitHub code for a signed authorization envelope.
    let substitute_code = code.is_some() && error.is_none();
    let mut forwarded: Vec<(String, String)> = Vec::new();
    for (key, value) in &params {
        match key.as_str() {
            "state" => {}
            "code" if substitute_code => {
                let authorization = AuthorizationEnvelope::new(
                    value.clone(),
                    Some(envelope.redirect_uri.clone()),
                    envelope.nonce.clone(),
                    envelope.scopes.clone(),
                );
                let code_jwt = envelopes::encode(&codec, &authorization)
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                forwarded.push(("code".to_string(), code_jwt));
            }
            _ => forwarded.push((key.clone(), value.clone())),
        }
    }
    if let Some(ref original_state) = envelope.state {
        forwarded.push(("state".to_string(), original_state.clone()));
    }

    let location = if forwarded.is_empty() {
        redirect_uri
    } else {
        let query = forwarded
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", redirect_uri, query)
    };

    Ok(HttpResponse::Found()
        .append_header(("Location", location))
        .finish())
}
