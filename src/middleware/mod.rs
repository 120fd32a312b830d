//! Custom actix middleware. Every layer works on `ServiceResponse<BoxBody>` so they stack
//! in any order.

pub mod auth;
pub mod cors;
pub mod logging;
pub mod rate_limit;
pub mod security;

pub use auth::{AuthMiddleware, AuthUser, RequireRole};
pub use cors::CorsMiddleware;
pub use logging::LoggingMiddleware;
pub use rate_limit::{create_rate_limiter, GlobalRateLimiter, RateLimitMiddleware};
pub use security::{RequestSizeLimitMiddleware, SecurityHeadersMiddleware};
