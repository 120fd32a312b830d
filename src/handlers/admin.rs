use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::middleware::AuthUser;
use crate::models::{MessageResponse, RoleUpdateRequest};
use crate::services::AdminService;
use crate::utils::{response, AppError, Page};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /admin/statistics
pub async fn statistics(admin: web::Data<Arc<AdminService>>) -> Result<HttpResponse, AppError> {
    Ok(response::success_response(admin.statistics().await?))
}

/// GET /admin/users
pub async fn list_users(
    query: web::Query<PageQuery>,
    admin: web::Data<Arc<AdminService>>,
) -> Result<HttpResponse, AppError> {
    let (users, pagination) = admin.list_users(Page::new(query.page, query.limit)).await?;
    Ok(response::success_response(json!({
        "users": users,
        "pagination": pagination,
    })))
}

/// GET /admin/users/{id}
pub async fn get_user(
    path: web::Path<i32>,
    admin: web::Data<Arc<AdminService>>,
) -> Result<HttpResponse, AppError> {
    Ok(response::success_response(admin.get_user(path.into_inner()).await?))
}

/// PUT /admin/users/{id}/role
pub async fn update_role(
    actor: AuthUser,
    path: web::Path<i32>,
    body: web::Json<RoleUpdateRequest>,
    admin: web::Data<Arc<AdminService>>,
) -> Result<HttpResponse, AppError> {
    let user = admin
        .update_role(actor.id(), path.into_inner(), body.role)
        .await?;
    Ok(response::success_response(user))
}

/// DELETE /admin/users/{id}
pub async fn delete_user(
    actor: AuthUser,
    path: web::Path<i32>,
    admin: web::Data<Arc<AdminService>>,
) -> Result<HttpResponse, AppError> {
    admin.delete_user(actor.id(), path.into_inner()).await?;
    Ok(response::success_response(MessageResponse::new("User deleted")))
}
