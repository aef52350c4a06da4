//! The token endpoint: authorization-code exchange and token minting.

use actix_web::{HttpRequest, HttpResponse, post, web};

use crate::auth;
use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::models::envelopes::{self, AuthorizationEnvelope};
use crate::services::github::GitHubClient;
use crate::services::minting::create_tokens;
use crate::services::redirect::{callback_base, fix_redirect_uri, issuer_url, service_base_url};
use crate::services::token_codec::{ClaimExpectations, TokenCodec};

fn field(form: &[(String, String)], name: &str) -> Option<String> {
    form.iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
}

/// Exchange an authorization code for an access token and ID token.
///
/// Client credentials may arrive via HTTP Basic or as `client_id` and
/// `client_secret` form fields, but not both.
#[utoipa::path(
    post,
    path = "/token",
    tag = "OpenID Connect",
    security(("client_credentials" = [])),
    request_body(content = String, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "The minted token pair", body = crate::models::responses::TokenResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorDetail)
    )
)]
#[post("/token")]
pub async fn token(
    req: HttpRequest,
    form: web::Form<Vec<(String, String)>>,
    settings: web::Data<Settings>,
    codec: web::Data<TokenCodec>,
    github: web::Data<GitHubClient>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    match field(&form, "grant_type").as_deref() {
        Some("authorization_code") => {}
        Some(other) => {
            return Err(AppError::InvalidRequest(format!(
                "Unsupported grant type {}; only authorization_code is supported",
                other
            )));
        }
        None => {
            return Err(AppError::InvalidRequest(
                "grant_type form field is required".to_string(),
            ));
        }
    }

    let credentials = auth::resolve_client_credentials(
        &req,
        field(&form, "client_id"),
        field(&form, "client_secret"),
    )?;

    if !auth::client_is_allowed(&credentials.client_id, &settings.allowed_clients) {
        return Err(AppError::InvalidRequest(format!(
            "Client ID {} is not allowed",
            credentials.client_id
        )));
    }

    let code = field(&form, "code").ok_or_else(|| {
        AppError::InvalidRequest("Authorization code is required".to_string())
    })?;

    let authorization: AuthorizationEnvelope =
        envelopes::decode(&codec, &code, &ClaimExpectations::default())
            .map_err(|_| AppError::InvalidRequest("Invalid authorization code".to_string()))?;

    let redirect_uri = field(&form, "redirect_uri");
    if redirect_uri.is_none() && authorization.redirect_uri.is_some() {
        return Err(AppError::InvalidRequest(
            "Redirect URI is required since it was sent at authorization".to_string(),
        ));
    }

    // Forward the form to GitHub with the real code and the wrapped
    // redirect URI; credentials travel via HTTP Basic instead.
    let callback = callback_base(&req, &settings);
    let mut exchange_form: Vec<(String, String)> = Vec::new();
    for (key, value) in &form {
        match key.as_str() {
            "client_id" | "client_secret" => {}
            "code" => exchange_form.push(("code".to_string(), authorization.code.clone())),
            "redirect_uri" => exchange_form.push((
                "redirect_uri".to_string(),
                fix_redirect_uri(value, &callback),
            )),
            _ => exchange_form.push((key.clone(), value.clone())),
        }
    }

    let github_token = github
        .exchange_code(
            &credentials.client_id,
            &credentials.client_secret,
            &exchange_form,
        )
        .await?;

    let issuer = issuer_url(&req, &settings);
    let userinfo_endpoint = format!("{}/userinfo", service_base_url(&req, &settings));

    let minted = create_tokens(
        &github,
        &codec,
        &settings,
        &issuer,
        &userinfo_endpoint,
        Some(&credentials.client_id),
        github_token,
        &authorization.scopes,
        authorization.nonce.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(minted.tokens))
}
