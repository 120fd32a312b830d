use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;

use crate::models::{MessageResponse, SuggestionFilter, SuggestionRequest};
use crate::services::SuggestionService;
use crate::utils::{response, AppError};

/// POST /suggestions
pub async fn submit(
    body: web::Json<SuggestionRequest>,
    suggestions: web::Data<Arc<SuggestionService>>,
) -> Result<HttpResponse, AppError> {
    Ok(response::created_response(suggestions.submit(body.into_inner()).await?))
}

/// GET /admin/suggestions
pub async fn list(
    query: web::Query<SuggestionFilter>,
    suggestions: web::Data<Arc<SuggestionService>>,
) -> Result<HttpResponse, AppError> {
    let (items, pagination) = suggestions.list(&query).await?;
    Ok(response::success_response(json!({
        "suggestions": items,
        "pagination": pagination,
    })))
}

/// DELETE /admin/suggestions/{id}
pub async fn delete(
    path: web::Path<i32>,
    suggestions: web::Data<Arc<SuggestionService>>,
) -> Result<HttpResponse, AppError> {
    suggestions.delete(path.into_inner()).await?;
    Ok(response::success_response(MessageResponse::new("Suggestion deleted")))
}
