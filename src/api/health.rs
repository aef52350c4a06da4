//! Root, health, and docs-gate endpoints.

use actix_web::{HttpRequest, HttpResponse, get, web};

use crate::config::{RootRedirect, Settings};
use crate::error::{AppError, AppResult};
use crate::services::redirect::service_base_url;

/// Where the `repo` root redirect points.
const REPO_URL: &str = "https://github.com/celsiusnarhwal/takagi";

/// Where the `settings` root redirect points.
const GITHUB_SETTINGS_URL: &str = "https://github.com/settings";

/// Redirect visitors according to `TAKAGI_ROOT_REDIRECT`.
#[get("/")]
pub async fn root(req: HttpRequest, settings: web::Data<Settings>) -> AppResult<HttpResponse> {
    let location = match settings.root_redirect {
        RootRedirect::Off => return Err(AppError::NotFound("Not Found".to_string())),
        RootRedirect::Repo => REPO_URL.to_string(),
        RootRedirect::Settings => GITHUB_SETTINGS_URL.to_string(),
        RootRedirect::Docs => format!("{}/docs", service_base_url(&req, &settings)),
    };

    Ok(HttpResponse::Found()
        .append_header(("Location", location))
        .finish())
}

/// Health check endpoint. Returns an empty 200 and does nothing else.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// Entry point for the interactive API reference.
///
/// The UI itself is mounted under `/docs/` when docs are enabled; this
/// route covers the bare path and the disabled case.
#[get("/docs")]
pub async fn docs_entry(
    req: HttpRequest,
    settings: web::Data<Settings>,
) -> AppResult<HttpResponse> {
    if !settings.enable_docs {
        return Err(AppError::NotFound("Not Found".to_string()));
    }

    Ok(HttpResponse::Found()
        .append_header((
            "Location",
            format!("{}/docs/", service_base_url(&req, &settings)),
        ))
        .finish())
}
