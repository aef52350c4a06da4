//! HTTP endpoint modules.

pub mod authorize;
pub mod callback;
pub mod discovery;
pub mod health;
pub mod openapi;
pub mod token;
pub mod userinfo;

pub use openapi::ApiDoc;

use actix_web::web;

/// Register every endpoint.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health::root)
        .service(health::health)
        .service(health::docs_entry)
        .service(authorize::authorize)
        .service(callback::redirect_root)
        .service(callback::callback)
        .service(token::token)
        .service(userinfo::userinfo)
        .service(discovery::jwks)
        .service(discovery::openid_configuration)
        .service(discovery::webfinger);
}
