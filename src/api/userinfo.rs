//! The UserInfo endpoint.

use actix_web::{HttpRequest, HttpResponse, route, web};
use secrecy::ExposeSecret;

use crate::auth;
use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::models::envelopes::{self, AccessInfo, AccessTokenEnvelope};
use crate::services::github::GitHubClient;
use crate::services::minting::create_tokens;
use crate::services::redirect::{issuer_url, service_base_url};
use crate::services::token_codec::{ClaimExpectations, TokenCodec};

/// Return current information about the authorized user's GitHub account.
///
/// Only `sub` is guaranteed to be present; other claims depend on the
/// scopes the access token was granted with. POST is accepted per OpenID
/// Connect Core 1.0 § 5.3 and behaves identically.
#[utoipa::path(
    get,
    path = "/userinfo",
    tag = "OpenID Connect",
    security(("access_token" = [])),
    responses(
        (status = 200, description = "Claims about the user", body = crate::models::responses::UserInfoResponse),
        (status = 401, description = "The access token is invalid")
    )
)]
#[route("/userinfo", method = "GET", method = "POST")]
pub async fn userinfo(
    req: HttpRequest,
    settings: web::Data<Settings>,
    codec: web::Data<TokenCodec>,
    github: web::Data<GitHubClient>,
) -> AppResult<HttpResponse> {
    let bearer = auth::bearer_token(&req).ok_or(AppError::Unauthorized)?;

    let issuer = issuer_url(&req, &settings);
    let userinfo_endpoint = format!("{}/userinfo", service_base_url(&req, &settings));

    // Both claims are essential; a token minted for another deployment or
    // another endpoint fails here.
    let expectations = ClaimExpectations {
        iss: Some(issuer.clone()),
        aud: Some(userinfo_endpoint.clone()),
    };
    let envelope: AccessTokenEnvelope =
        envelopes::decode(&codec, bearer.expose_secret(), &expectations)
            .map_err(|_| AppError::Unauthorized)?;

    let plaintext = codec
        .decrypt(&envelope.token)
        .map_err(|_| AppError::Unauthorized)?;
    let access_info: AccessInfo =
        serde_json::from_slice(&plaintext).map_err(|_| AppError::Unauthorized)?;

    let minted = create_tokens(
        &github,
        &codec,
        &settings,
        &issuer,
        &userinfo_endpoint,
        None,
        access_info.token,
        &access_info.scopes,
        None,
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::Value::Object(minted.identity_claims)))
}
