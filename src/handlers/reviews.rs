use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;

use crate::middleware::AuthUser;
use crate::models::{
    AdminReviewUpdate, MessageResponse, ModerationRequest, ReviewFilter, ReviewRequest,
    ReviewStatus,
};
use crate::services::ReviewService;
use crate::utils::{response, AppError};

/// POST /reviews
pub async fn create(
    user: AuthUser,
    body: web::Json<ReviewRequest>,
    reviews: web::Data<Arc<ReviewService>>,
) -> Result<HttpResponse, AppError> {
    let review = reviews.create(user.id(), body.into_inner()).await?;
    Ok(response::created_response(review))
}

/// GET /reviews/{id}
pub async fn get(
    user: Option<AuthUser>,
    path: web::Path<i32>,
    reviews: web::Data<Arc<ReviewService>>,
) -> Result<HttpResponse, AppError> {
    let viewer = user.as_ref().map(AuthUser::id);
    Ok(response::success_response(reviews.get_public(path.into_inner(), viewer).await?))
}

/// GET /reviews/company/{company_id}
pub async fn list_for_company(
    user: Option<AuthUser>,
    path: web::Path<i32>,
    query: web::Query<ReviewFilter>,
    reviews: web::Data<Arc<ReviewService>>,
) -> Result<HttpResponse, AppError> {
    let viewer = user.as_ref().map(AuthUser::id);
    let (items, pagination) = reviews
        .list_for_company(path.into_inner(), &query, viewer)
        .await?;
    Ok(response::success_response(json!({
        "reviews": items,
        "pagination": pagination,
    })))
}

/// POST /reviews/{id}/useful
pub async fn mark_useful(
    user: AuthUser,
    path: web::Path<i32>,
    reviews: web::Data<Arc<ReviewService>>,
) -> Result<HttpResponse, AppError> {
    Ok(response::success_response(reviews.mark_useful(user.id(), path.into_inner()).await?))
}

/// DELETE /reviews/{id}/useful
pub async fn unmark_useful(
    user: AuthUser,
    path: web::Path<i32>,
    reviews: web::Data<Arc<ReviewService>>,
) -> Result<HttpResponse, AppError> {
    Ok(response::success_response(reviews.unmark_useful(user.id(), path.into_inner()).await?))
}

/// GET /admin/reviews/moderation/{status}
pub async fn moderation_queue(
    path: web::Path<String>,
    query: web::Query<ReviewFilter>,
    reviews: web::Data<Arc<ReviewService>>,
) -> Result<HttpResponse, AppError> {
    let status: ReviewStatus = path
        .parse()
        .map_err(|_| AppError::not_found("Unknown moderation status"))?;
    let (items, pagination) = reviews.list_by_status(status, &query).await?;
    Ok(response::success_response(json!({
        "reviews": items,
        "pagination": pagination,
    })))
}

/// PUT /admin/reviews/{id}/approve
pub async fn approve(
    moderator: AuthUser,
    path: web::Path<i32>,
    body: Option<web::Json<ModerationRequest>>,
    reviews: web::Data<Arc<ReviewService>>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let req = body.map(web::Json::into_inner).unwrap_or_default();
    let review = reviews.approve(id, req).await?;
    log::info!("Review {} approved by user {}", id, moderator.id());
    Ok(response::success_response(review))
}

/// PUT /admin/reviews/{id}/reject
pub async fn reject(
    moderator: AuthUser,
    path: web::Path<i32>,
    body: web::Json<ModerationRequest>,
    reviews: web::Data<Arc<ReviewService>>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let review = reviews.reject(id, body.into_inner()).await?;
    log::info!("Review {} rejected by user {}", id, moderator.id());
    Ok(response::success_response(review))
}

/// PUT /admin/reviews/{id}
pub async fn admin_update(
    path: web::Path<i32>,
    body: web::Json<AdminReviewUpdate>,
    reviews: web::Data<Arc<ReviewService>>,
) -> Result<HttpResponse, AppError> {
    let review = reviews.admin_update(path.into_inner(), body.into_inner()).await?;
    Ok(response::success_response(review))
}

/// DELETE /admin/reviews/{id}
pub async fn admin_delete(
    path: web::Path<i32>,
    reviews: web::Data<Arc<ReviewService>>,
) -> Result<HttpResponse, AppError> {
    reviews.admin_delete(path.into_inner()).await?;
    Ok(response::success_response(MessageResponse::new("Review deleted")))
}
