//! Takagi library.
//!
//! Takagi lets you use GitHub as an OpenID Connect provider: it speaks
//! OIDC discovery, authorization-code grant, and UserInfo to relying
//! parties while delegating the actual authentication to GitHub's OAuth2
//! server. The service is stateless; all flow context travels in signed
//! (and, for the GitHub credential, encrypted) JWTs.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
