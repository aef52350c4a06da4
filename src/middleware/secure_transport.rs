//! Middleware enforcing HTTPS for external connections.

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::{Error, HttpResponse};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

use crate::config::LOOPBACK_HOSTS;
use crate::services::redirect::host_without_port;

/// Secure transport middleware factory.
pub struct SecureTransport {
    treat_loopback_as_secure: bool,
}

impl SecureTransport {
    pub fn new(treat_loopback_as_secure: bool) -> Self {
        SecureTransport {
            treat_loopback_as_secure,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecureTransport
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SecureTransportMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecureTransportMiddleware {
            service,
            treat_loopback_as_secure: self.treat_loopback_as_secure,
        }))
    }
}

/// Secure transport middleware service.
pub struct SecureTransportMiddleware<S> {
    service: S,
    treat_loopback_as_secure: bool,
}

impl<S, B> Service<ServiceRequest> for SecureTransportMiddleware<S>
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
        let secure = {
            let info = req.connection_info();
            let host = host_without_port(info.host()).to_string();
            info.scheme() == "https"
                || (self.treat_loopback_as_secure && LOOPBACK_HOSTS.contains(&host.as_str()))
        };

        if !secure {
            let response = HttpResponse::BadRequest().json(serde_json::json!({
                "detail": "Takagi must be served over HTTPS. If you're using a reverse proxy, \
                           make sure it forwards X-Forwarded-Proto."
            }));
            return Box::pin(ready(Ok(req.into_response(response).map_into_right_body())));
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}
