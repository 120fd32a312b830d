use actix_web::{
    body::BoxBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::future::{ready, Ready};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::utils::AppError;

/// Process-wide limiter shared by every worker.
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// `requests` per `window`, with a burst of the full request count.
pub fn build_quota(requests: u32, window: Duration) -> Quota {
    let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
    let period = window
        .checked_div(burst.get())
        .filter(|p| !p.is_zero())
        .unwrap_or(Duration::from_millis(1));

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

pub fn create_rate_limiter(requests: u32, window: Duration) -> Arc<GlobalRateLimiter> {
    Arc::new(RateLimiter::direct(build_quota(requests, window)))
}

/// Rejects requests over the global quota with 429.
pub struct RateLimitMiddleware {
    limiter: Arc<GlobalRateLimiter>,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<GlobalRateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Arc::new(service),
            limiter: Arc::clone(&self.limiter),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Arc<S>,
    limiter: Arc<GlobalRateLimiter>,
}

impl<S> Service<ServiceRequest> for RateLimitMiddlewareService<S>
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
        let allowed = self.limiter.check().is_ok();

        Box::pin(async move {
            if !allowed {
                log::warn!(
                    "Rate limit exceeded: {} {} from {}",
                    req.method(),
                    req.path(),
                    req.connection_info().peer_addr().unwrap_or("unknown")
                );
                let response = AppError::too_many_requests(
                    "Rate limit exceeded. Please try again later.",
                )
                .error_response();
                return Ok(req.into_response(response));
            }

            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_equals_request_count() {
        let limiter = create_rate_limiter(3, Duration::from_secs(60));
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn zero_requests_still_builds_a_quota() {
        let limiter = create_rate_limiter(0, Duration::from_secs(60));
        assert!(limiter.check().is_ok());
    }
}
