//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Takagi",
        version = "2.0.0",
        description = "Takagi lets you use GitHub as an OpenID Connect provider.",
        license(name = "MIT License")
    ),
    servers(
        (url = "/", description = "This server")
    ),
    paths(
        api::health::health,
        api::authorize::authorize,
        api::callback::callback,
        api::token::token,
        api::userinfo::userinfo,
        api::discovery::jwks,
        api::discovery::openid_configuration,
        api::discovery::webfinger,
    ),
    components(
        schemas(
            error::ErrorDetail,
            models::responses::TokenResponse,
            models::responses::UserInfoResponse,
            models::responses::PublicJwk,
            models::responses::JwksDocument,
            models::responses::WebFingerLink,
            models::responses::WebFingerResponse,
            models::responses::DiscoveryDocument,
        )
    ),
    tags(
        (name = "OpenID Connect", description = "The authorization, token, and UserInfo endpoints"),
        (name = "Discovery", description = "Issuer metadata and key publication"),
        (name = "Health", description = "Health check")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Register the client-credential and access-token security schemes.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "client_credentials",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)),
            );
            components.add_security_scheme(
                "access_token",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
