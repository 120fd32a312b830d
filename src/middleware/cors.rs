use actix_web::{
    body::BoxBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    Error, HttpResponse,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, X-Requested-With";

/// CORS middleware. `*` in the allow list admits any origin.
/// Preflight requests are answered here with 204.
pub struct CorsMiddleware {
    allowed_origins: Arc<Vec<String>>,
}

impl CorsMiddleware {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self {
            allowed_origins: Arc::new(allowed_origins),
        }
    }
}

fn origin_allowed(allowed: &[String], origin: &str) -> bool {
    allowed.iter().any(|o| o == "*" || o.eq_ignore_ascii_case(origin))
}

fn apply_cors_headers(headers: &mut header::HeaderMap, origin: Option<header::HeaderValue>) {
    if let Some(origin) = origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(header::VARY, header::HeaderValue::from_static("Origin"));
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        header::HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        header::HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        header::HeaderValue::from_static("true"),
    );
}

impl<S> Transform<S, ServiceRequest> for CorsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = CorsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorsMiddlewareService {
            service: Arc::new(service),
            allowed_origins: Arc::clone(&self.allowed_origins),
        }))
    }
}

pub struct CorsMiddlewareService<S> {
    service: Arc<S>,
    allowed_origins: Arc<Vec<String>>,
}

impl<S> Service<ServiceRequest> for CorsMiddlewareService<S>
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
        let allowed_origins = Arc::clone(&self.allowed_origins);

        Box::pin(async move {
            let origin = req
                .headers()
                .get(header::ORIGIN)
                .filter(|o| {
                    o.to_str()
                        .map(|s| origin_allowed(&allowed_origins, s))
                        .unwrap_or(false)
                })
                .cloned();

            if req.method() == Method::OPTIONS {
                let mut response = HttpResponse::NoContent().finish();
                apply_cors_headers(response.headers_mut(), origin);
                return Ok(req.into_response(response));
            }

            let mut res = service.call(req).await?;
            apply_cors_headers(res.headers_mut(), origin);
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_and_exact_origins() {
        let any = vec!["*".to_string()];
        assert!(origin_allowed(&any, "https://example.com"));

        let list = vec!["https://jobsolution.ru".to_string()];
        assert!(origin_allowed(&list, "https://jobsolution.ru"));
        assert!(!origin_allowed(&list, "https://evil.example"));
    }
}
