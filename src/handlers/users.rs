use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;

use crate::middleware::AuthUser;
use crate::models::{ReviewFilter, UpdateProfileRequest};
use crate::services::{ReviewService, UserService};
use crate::utils::{response, AppError};

/// GET /users/me
pub async fn me(user: AuthUser, users: web::Data<Arc<UserService>>) -> Result<HttpResponse, AppError> {
    Ok(response::success_response(users.profile(user.id()).await?))
}

/// PUT /users/me
pub async fn update_me(
    user: AuthUser,
    body: web::Json<UpdateProfileRequest>,
    users: web::Data<Arc<UserService>>,
) -> Result<HttpResponse, AppError> {
    let profile = users.update_profile(user.id(), body.into_inner()).await?;
    Ok(response::success_response(profile))
}

/// GET /users/me/reviews
pub async fn my_reviews(
    user: AuthUser,
    query: web::Query<ReviewFilter>,
    reviews: web::Data<Arc<ReviewService>>,
) -> Result<HttpResponse, AppError> {
    let (items, pagination) = reviews.list_for_author(user.id(), &query).await?;
    Ok(response::success_response(json!({
        "reviews": items,
        "pagination": pagination,
    })))
}
