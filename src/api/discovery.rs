//! Discovery endpoints: JWKS, OpenID Connect Discovery, and WebFinger.

use actix_web::{HttpRequest, HttpResponse, get, web};

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::models::responses::{DiscoveryDocument, WebFingerLink, WebFingerResponse};
use crate::services::keys::KeyMaterial;
use crate::services::redirect::{issuer_url, service_base_url};
use crate::services::webfinger::{host_is_allowed, parse_acct_resource};
use std::sync::Arc;

/// The link relation WebFinger answers with an issuer for.
const ISSUER_RELATION: &str = "http://openid.net/specs/connect/1.0/issuer";

/// The public JSON Web Key Set.
#[utoipa::path(
    get,
    path = "/.well-known/jwks.json",
    tag = "Discovery",
    responses(
        (status = 200, description = "The public keys", body = crate::models::responses::JwksDocument)
    )
)]
#[get("/.well-known/jwks.json")]
pub async fn jwks(keys: web::Data<Arc<KeyMaterial>>) -> HttpResponse {
    HttpResponse::Ok().json(keys.public_jwks())
}

/// OpenID Connect Discovery 1.0 metadata.
///
/// Every URL is derived from the current request's base URL.
#[utoipa::path(
    get,
    path = "/.well-known/openid-configuration",
    tag = "Discovery",
    responses(
        (status = 200, description = "Issuer metadata", body = crate::models::responses::DiscoveryDocument)
    )
)]
#[get("/.well-known/openid-configuration")]
pub async fn openid_configuration(
    req: HttpRequest,
    settings: web::Data<Settings>,
) -> HttpResponse {
    let base = service_base_url(&req, &settings);
    HttpResponse::Ok().json(DiscoveryDocument::for_base_url(&base))
}

#[derive(serde::Deserialize)]
pub struct WebFingerQuery {
    resource: Option<String>,
    rel: Option<String>,
}

/// Limited WebFinger support: resolve `acct:` emails to this issuer.
#[utoipa::path(
    get,
    path = "/.well-known/webfinger",
    tag = "Discovery",
    params(
        ("resource" = String, Query, description = "An email address prepended with `acct:`"),
        ("rel" = Option<String>, Query, description = "The requested link relation"),
    ),
    responses(
        (status = 200, description = "Resource descriptor", body = crate::models::responses::WebFingerResponse),
        (status = 400, description = "Malformed resource", body = crate::error::ErrorDetail),
        (status = 404, description = "Unknown resource", body = crate::error::ErrorDetail)
    )
)]
#[get("/.well-known/webfinger")]
pub async fn webfinger(
    req: HttpRequest,
    query: web::Query<WebFingerQuery>,
    settings: web::Data<Settings>,
) -> AppResult<HttpResponse> {
    let resource = query.resource.as_deref().ok_or_else(|| {
        AppError::InvalidRequest("resource query parameter is required".to_string())
    })?;

    let (local, domain) = parse_acct_resource(resource)
        .map_err(|reason| AppError::InvalidRequest(format!("invalid resource: {}", reason)))?;
    let subject = format!("acct:{}@{}", local, domain);

    if !host_is_allowed(&domain, &settings.allowed_webfinger_hosts) {
        return Err(AppError::NotFound(format!(
            "The resource {} does not exist on this server",
            subject
        )));
    }

    let rel = query.rel.as_deref().unwrap_or(ISSUER_RELATION);
    let mut links = Vec::new();
    if rel == ISSUER_RELATION {
        links.push(WebFingerLink {
            rel: rel.to_string(),
            href: issuer_url(&req, &settings),
        });
    }

    Ok(HttpResponse::Ok().json(WebFingerResponse { subject, links }))
}
