//! Redirect-URI normalization and the secure-transport rule.
//!
//! Every relying-party redirect URI is forced through the callback endpoint:
//! `https://rp.example/cb` becomes `<base>/r/https://rp.example/cb`, so
//! GitHub always redirects here first.

use actix_web::HttpRequest;
use actix_web::http::Uri;

use crate::config::{LOOPBACK_HOSTS, Settings};

/// The service base URL for the current request, without a trailing slash.
///
/// Derived from the connection info (honoring `X-Forwarded-*` from a reverse
/// proxy) and the configured base path, never from stored state.
pub fn service_base_url(req: &HttpRequest, settings: &Settings) -> String {
    let info = req.connection_info();
    format!("{}://{}{}", info.scheme(), info.host(), settings.path_prefix())
}

/// The issuer URL: the base URL with a trailing slash.
pub fn issuer_url(req: &HttpRequest, settings: &Settings) -> String {
    format!("{}/", service_base_url(req, settings))
}

/// The callback mount point, `<base>/r`.
pub fn callback_base(req: &HttpRequest, settings: &Settings) -> String {
    format!("{}/r", service_base_url(req, settings))
}

/// Rewrite a redirect URI to be a subpath of the callback endpoint.
///
/// Already-wrapped URIs pass through unchanged, so the operation is
/// idempotent.
pub fn fix_redirect_uri(redirect_uri: &str, callback_base: &str) -> String {
    if redirect_uri.starts_with(&format!("{}/", callback_base)) {
        redirect_uri.to_string()
    } else {
        format!("{}/{}", callback_base, redirect_uri)
    }
}

/// Whether a URL satisfies the secure-transport rule: HTTPS, or a loopback
/// address when those are configured as secure.
pub fn is_secure_transport(url: &str, settings: &Settings) -> bool {
    let Ok(uri) = url.parse::<Uri>() else {
        return false;
    };

    if uri.scheme_str() == Some("https") {
        return true;
    }

    settings.treat_loopback_as_secure
        && uri
            .host()
            .map(|host| host.trim_start_matches('[').trim_end_matches(']'))
            .is_some_and(|host| LOOPBACK_HOSTS.contains(&host))
}

/// Strip a port (and IPv6 brackets) from a Host value.
pub fn host_without_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}
