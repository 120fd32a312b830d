use actix_web::{web, HttpResponse};
use std::sync::Arc;
use validator::Validate;

use crate::models::{
    ForgotPasswordRequest, LoginRequest, MessageResponse, RefreshTokenRequest, RegisterRequest,
    ResetPasswordRequest,
};
use crate::services::UserService;
use crate::utils::{response, AppError};

/// POST /auth/register
pub async fn register(
    body: web::Json<RegisterRequest>,
    users: web::Data<Arc<UserService>>,
) -> Result<HttpResponse, AppError> {
    let auth = users.register(body.into_inner()).await?;
    Ok(response::created_response(auth))
}

/// POST /auth/login
pub async fn login(
    body: web::Json<LoginRequest>,
    users: web::Data<Arc<UserService>>,
) -> Result<HttpResponse, AppError> {
    let auth = users.login(body.into_inner()).await?;
    Ok(response::success_response(auth))
}

/// POST /auth/refresh
pub async fn refresh(
    body: web::Json<RefreshTokenRequest>,
    users: web::Data<Arc<UserService>>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let auth = users.refresh(&body.refresh_token).await?;
    Ok(response::success_response(auth))
}

/// POST /auth/logout
pub async fn logout(
    body: web::Json<RefreshTokenRequest>,
    users: web::Data<Arc<UserService>>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    users.logout(&body.refresh_token).await?;
    Ok(response::success_response(MessageResponse::new("Logged out successfully")))
}

/// POST /auth/forgot-password
pub async fn forgot_password(
    body: web::Json<ForgotPasswordRequest>,
    users: web::Data<Arc<UserService>>,
) -> Result<HttpResponse, AppError> {
    let issued = users.forgot_password(body.into_inner()).await?;
    Ok(response::success_response(issued))
}

/// POST /auth/reset-password
pub async fn reset_password(
    body: web::Json<ResetPasswordRequest>,
    users: web::Data<Arc<UserService>>,
) -> Result<HttpResponse, AppError> {
    users.reset_password(body.into_inner()).await?;
    Ok(response::success_response(MessageResponse::new(
        "Password has been reset. Please sign in again",
    )))
}
