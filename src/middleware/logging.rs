use actix_web::{
    body::BoxBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;

/// Access log: method, path, status, duration and peer address per request.
/// Server errors log at `warn`, everything else at `info`.
pub struct LoggingMiddleware;

impl<S> Transform<S, ServiceRequest> for LoggingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggingMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggingMiddlewareService {
            service: Arc::new(service),
        }))
    }
}

pub struct LoggingMiddlewareService<S> {
    service: Arc<S>,
}

impl<S> Service<ServiceRequest> for LoggingMiddlewareService<S>
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
        let start_time = std::time::Instant::now();
        let method = req.method().clone();
        // Path only: query strings may carry search terms or tokens.
        let path = req.path().to_string();
        let remote_addr = req
            .connection_info()
            .peer_addr()
            .unwrap_or("unknown")
            .to_string();

        Box::pin(async move {
            let result = service.call(req).await;
            let elapsed = start_time.elapsed().as_millis();

            match &result {
                Ok(res) if res.status().is_server_error() => log::warn!(
                    "{} {} {} {}ms from {}",
                    method,
                    path,
                    res.status().as_u16(),
                    elapsed,
                    remote_addr
                ),
                Ok(res) => log::info!(
                    "{} {} {} {}ms from {}",
                    method,
                    path,
                    res.status().as_u16(),
                    elapsed,
                    remote_addr
                ),
                Err(err) => log::error!(
                    "{} {} failed after {}ms from {}: {}",
                    method,
                    path,
                    elapsed,
                    remote_addr,
                    err
                ),
            }

            result
        })
    }
}
