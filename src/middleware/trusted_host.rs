//! Middleware filtering requests by Host header.

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::{Error, HttpResponse};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::sync::Arc;

use crate::services::redirect::host_without_port;

/// Trusted host middleware factory.
///
/// Patterns: an exact host name, `*` (any host), or `*.example.com`
/// (subdomains of example.com). Matching ignores the port and case.
pub struct TrustedHost {
    allowed: Arc<Vec<String>>,
}

impl TrustedHost {
    pub fn new(allowed_hosts: &[String]) -> Self {
        TrustedHost {
            allowed: Arc::new(
                allowed_hosts
                    .iter()
                    .map(|h| h.to_lowercase())
                    .collect(),
            ),
        }
    }
}

fn host_is_trusted(host: &str, allowed: &[String]) -> bool {
    let host = host_without_port(host).to_lowercase();
    allowed.iter().any(|pattern| {
        if pattern == "*" {
            return true;
        }
        if let Some(parent) = pattern.strip_prefix("*.") {
            return host.ends_with(&format!(".{}", parent));
        }
        *pattern == host
    })
}

impl<S, B> Transform<S, ServiceRequest> for TrustedHost
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = TrustedHostMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TrustedHostMiddleware {
            service,
            allowed: self.allowed.clone(),
        }))
    }
}

/// Trusted host middleware service.
pub struct TrustedHostMiddleware<S> {
    service: S,
    allowed: Arc<Vec<String>>,
}

impl<S, B> Service<ServiceRequest> for TrustedHostMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let trusted = {
            let info = req.connection_info();
            host_is_trusted(info.host(), &self.allowed)
        };

        if !trusted {
            let response = HttpResponse::BadRequest().json(serde_json::json!({
                "detail": "Invalid host header"
            }));
            return Box::pin(ready(Ok(req.into_response(response).map_into_right_body())));
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}
