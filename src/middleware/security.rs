use actix_web::{
    body::BoxBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, StatusCode},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;

use crate::utils;

/// Request size limiting middleware, checked against `Content-Length`.
pub struct RequestSizeLimitMiddleware {
    pub max_size: usize,
}

impl<S> Transform<S, ServiceRequest> for RequestSizeLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestSizeLimitMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestSizeLimitMiddlewareService {
            service: Arc::new(service),
            max_size: self.max_size,
        }))
    }
}

pub struct RequestSizeLimitMiddlewareService<S> {
    service: Arc<S>,
    max_size: usize,
}

impl<S> Service<ServiceRequest> for RequestSizeLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Arc::clone(&self.service);
        let max_size = self.max_size;

        Box::pin(async move {
            let declared = req
                .headers()
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<usize>().ok());

            if let Some(length) = declared.filter(|len| *len > max_size) {
                let response = utils::response::error_response(
                    &format!("Request size {} exceeds maximum allowed size {}", length, max_size),
                    StatusCode::PAYLOAD_TOO_LARGE,
                    Vec::new(),
                );
                return Ok(req.into_response(response));
            }

            service.call(req).await
        })
    }
}

/// Adds the standard hardening headers to every response.
pub struct SecurityHeadersMiddleware;

impl<S> Transform<S, ServiceRequest> for SecurityHeadersMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityHeadersMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityHeadersMiddlewareService {
            service: Arc::new(service),
        }))
    }
}

pub struct SecurityHeadersMiddlewareService<S> {
    service: Arc<S>,
}

impl<S> Service<ServiceRequest> for SecurityHeadersMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Arc::clone(&self.service);

        Box::pin(async move {
            let mut res = service.call(req).await?;
            let headers = res.headers_mut();

            for (name, value) in [
                (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
                (header::X_FRAME_OPTIONS, "DENY"),
                (header::X_XSS_PROTECTION, "1; mode=block"),
                (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
            ] {
                headers.insert(name, header::HeaderValue::from_static(value));
            }

            Ok(res)
        })
    }
}
