use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;

use crate::models::{CompanyFilter, CompanyRequest, CompanySize, MessageResponse};
use crate::services::{CompanyService, ReferenceService};
use crate::utils::{response, AppError};

/// GET /companies
pub async fn list(
    query: web::Query<CompanyFilter>,
    companies: web::Data<Arc<CompanyService>>,
) -> Result<HttpResponse, AppError> {
    let (items, pagination) = companies.list(&query).await?;
    Ok(response::success_response(json!({
        "companies": items,
        "company_sizes": CompanySize::options(),
        "pagination": pagination,
    })))
}

/// GET /companies/{id_or_slug}
pub async fn get(
    path: web::Path<String>,
    companies: web::Data<Arc<CompanyService>>,
) -> Result<HttpResponse, AppError> {
    Ok(response::success_response(companies.get(&path).await?))
}

/// GET /industries/company/{id}
pub async fn industries(
    path: web::Path<i32>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    let items = reference.company_industries(path.into_inner()).await?;
    Ok(response::success_response(json!({ "industries": items })))
}

/// POST /admin/companies
pub async fn create(
    body: web::Json<CompanyRequest>,
    companies: web::Data<Arc<CompanyService>>,
) -> Result<HttpResponse, AppError> {
    let company = companies.create(body.into_inner()).await?;
    Ok(response::created_response(company))
}

/// PUT /admin/companies/{id}
pub async fn update(
    path: web::Path<i32>,
    body: web::Json<CompanyRequest>,
    companies: web::Data<Arc<CompanyService>>,
) -> Result<HttpResponse, AppError> {
    let company = companies.update(path.into_inner(), body.into_inner()).await?;
    Ok(response::success_response(company))
}

/// DELETE /admin/companies/{id}
pub async fn delete(
    path: web::Path<i32>,
    companies: web::Data<Arc<CompanyService>>,
) -> Result<HttpResponse, AppError> {
    companies.delete(path.into_inner()).await?;
    Ok(response::success_response(MessageResponse::new("Company deleted")))
}
