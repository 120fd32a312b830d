use actix_web::{
    body::BoxBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;

use crate::auth::{extract_token_from_request, AuthService, Claims};
use crate::utils::{self, AppError};

/// Decodes the bearer token and stores its `Claims` in the request extensions.
///
/// In required mode a missing or invalid token ends the request with 401.
/// In optional mode the request continues anonymously.
pub struct AuthMiddleware {
    auth_service: Arc<AuthService>,
    required: bool,
}

impl AuthMiddleware {
    pub fn required(auth_service: Arc<AuthService>) -> Self {
        Self {
            auth_service,
            required: true,
        }
    }

    pub fn optional(auth_service: Arc<AuthService>) -> Self {
        Self {
            auth_service,
            required: false,
        }
    }
}

impl<S> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Arc::new(service),
            auth_service: Arc::clone(&self.auth_service),
            required: self.required,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
    auth_service: Arc<AuthService>,
    required: bool,
}

impl<S> Service<ServiceRequest> for AuthMiddlewareService<S>
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
        let auth_service = Arc::clone(&self.auth_service);
        let required = self.required;

        Box::pin(async move {
            // Claims may already be present when an outer scope authenticated the request.
            if req.extensions().get::<Claims>().is_some() {
                return service.call(req).await;
            }

            let claims = match extract_token_from_request(&req) {
                Some(token) => match auth_service.validate_access_token(&token) {
                    Ok(claims) => Some(claims),
                    Err(err) => {
                        log::debug!(
                            "Rejected token {} for {}: {}",
                            utils::mask_sensitive(&token),
                            req.path(),
                            err
                        );
                        None
                    }
                },
                None => None,
            };

            match claims {
                Some(claims) => {
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                }
                None if required => {
                    let response = utils::response::error_response(
                        "Missing or invalid authentication token",
                        StatusCode::UNAUTHORIZED,
                        Vec::new(),
                    );
                    Ok(req.into_response(response))
                }
                None => service.call(req).await,
            }
        })
    }
}

/// Which roles a scope admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoleRequirement {
    Admin,
    Staff,
}

/// Role gate. Must sit inside an `AuthMiddleware`; without claims it answers 401,
/// with the wrong role 403.
pub struct RequireRole {
    requirement: RoleRequirement,
}

impl RequireRole {
    pub fn admin() -> Self {
        Self {
            requirement: RoleRequirement::Admin,
        }
    }

    /// Admins and moderators.
    pub fn staff() -> Self {
        Self {
            requirement: RoleRequirement::Staff,
        }
    }
}

impl<S> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireRoleService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireRoleService {
            service: Arc::new(service),
            requirement: self.requirement,
        }))
    }
}

pub struct RequireRoleService<S> {
    service: Arc<S>,
    requirement: RoleRequirement,
}

impl<S> Service<ServiceRequest> for RequireRoleService<S>
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
        let requirement = self.requirement;

        Box::pin(async move {
            let role = req.extensions().get::<Claims>().map(|c| c.role);
            let allowed = match (role, requirement) {
                (None, _) => {
                    let response = utils::response::error_response(
                        "Authentication required",
                        StatusCode::UNAUTHORIZED,
                        Vec::new(),
                    );
                    return Ok(req.into_response(response));
                }
                (Some(role), RoleRequirement::Staff) => role.is_staff(),
                (Some(role), RoleRequirement::Admin) => role == crate::models::UserRole::Admin,
            };

            if !allowed {
                let response = utils::response::error_response(
                    "Insufficient permissions",
                    StatusCode::FORBIDDEN,
                    Vec::new(),
                );
                return Ok(req.into_response(response));
            }

            service.call(req).await
        })
    }
}

/// The authenticated caller. Use `Option<AuthUser>` on routes where auth is optional.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.0.user_id
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Claims>()
                .cloned()
                .map(AuthUser)
                .ok_or_else(|| AppError::unauthorized("Authentication required")),
        )
    }
}
