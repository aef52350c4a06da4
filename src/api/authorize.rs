//! The authorization endpoint: the entry point of the flow.

use actix_web::{HttpRequest, HttpResponse, get, web};

use crate::auth;
use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::models::envelopes::{self, StateEnvelope};
use crate::services::github::GitHubClient;
use crate::services::redirect::{callback_base, fix_redirect_uri, is_secure_transport};
use crate::services::scopes::{ScopeFormat, convert_scopes_to_string, scope_to_list};
use crate::services::token_codec::TokenCodec;

/// Find the first value for a query parameter.
fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn required<'a>(params: &'a [(String, String)], name: &str) -> AppResult<&'a str> {
    param(params, name)
        .ok_or_else(|| AppError::InvalidRequest(format!("{} query parameter is required", name)))
}

/// Begin the authorization flow.
///
/// Validates the request, seals its context into a state envelope, and
/// redirects the browser to GitHub with the envelope riding in `state`.
#[utoipa::path(
    get,
    path = "/authorize",
    tag = "OpenID Connect",
    params(
        ("client_id" = String, Query, description = "GitHub application client ID"),
        ("scope" = String, Query, description = "Supported scopes are `openid`, `profile`, `email`, and `groups`. Only `openid` is required."),
        ("redirect_uri" = String, Query, description = "Where to send the user afterwards"),
        ("state" = Option<String>, Query, description = "Opaque value echoed back to the client"),
        ("nonce" = Option<String>, Query, description = "Value copied into the ID token"),
    ),
    responses(
        (status = 302, description = "Redirect to GitHub"),
        (status = 400, description = "Invalid request", body = crate::error::ErrorDetail)
    )
)]
#[get("/authorize")]
pub async fn authorize(
    req: HttpRequest,
    query: web::Query<Vec<(String, String)>>,
    settings: web::Data<Settings>,
    codec: web::Data<TokenCodec>,
    github: web::Data<GitHubClient>,
) -> AppResult<HttpResponse> {
    let params = query.into_inner();

    let client_id = required(&params, "client_id")?.to_string();
    let scope = required(&params, "scope")?.to_string();
    let mut redirect_uri = required(&params, "redirect_uri")?.to_string();

    if !auth::client_is_allowed(&client_id, &settings.allowed_clients) {
        return Err(AppError::InvalidRequest(format!(
            "Client ID {} is not allowed",
            client_id
        )));
    }

    if !is_secure_transport(&redirect_uri, &settings) {
        return Err(AppError::InvalidRequest(format!(
            "Redirect URI {} is insecure. Redirect URIs must be either HTTPS or localhost",
            redirect_uri
        )));
    }

    let callback = callback_base(&req, &settings);
    let fixed_redirect_uri = fix_redirect_uri(&redirect_uri, &callback);

    if redirect_uri != fixed_redirect_uri {
        if settings.fix_redirect_uris {
            redirect_uri = fixed_redirect_uri;
        } else {
            return Err(AppError::InvalidRequest(format!(
                "Redirect URI must be a subpath of {} (e.g., {})",
                callback, fixed_redirect_uri
            )));
        }
    }

    let scopes = scope_to_list(&scope);
    if !scopes.iter().any(|s| s == "openid") {
        return Err(AppError::InvalidRequest(
            "openid scope is required".to_string(),
        ));
    }

    let referrer = req
        .headers()
        .get("referer")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let envelope = StateEnvelope::new(
        redirect_uri.clone(),
        param(&params, "state").map(|v| v.to_string()),
        param(&params, "nonce").map(|v| v.to_string()),
        scopes.clone(),
        referrer,
    );
    let state_jwt = envelopes::encode(&codec, &envelope)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    // client_id and scope are re-derived; state and redirect_uri are
    // replaced; everything else the relying party sent passes through.
    let mut authorization_params = vec![
        ("client_id".to_string(), client_id),
        (
            "scope".to_string(),
            convert_scopes_to_string(&scopes, ScopeFormat::GitHub),
        ),
    ];
    let mut state_written = false;
    for (key, value) in &params {
        match key.as_str() {
            "client_id" | "scope" => {}
            "state" => {
                if !state_written {
                    authorization_params.push(("state".to_string(), state_jwt.clone()));
                    state_written = true;
                }
            }
            "redirect_uri" => {
                authorization_params.push(("redirect_uri".to_string(), redirect_uri.clone()));
            }
            _ => authorization_params.push((key.clone(), value.clone())),
        }
    }
    if !state_written {
        authorization_params.push(("state".to_string(), state_jwt));
    }

    let location = github.authorization_url(&authorization_params);

    Ok(HttpResponse::Found()
        .append_header(("Location", location))
        .finish())
}
