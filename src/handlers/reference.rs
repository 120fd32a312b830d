//! Cities, industries and the id/name/description lookup tables.
//!
//! Lookup routes share one set of handlers; the scope they are mounted under
//! registers the `LookupKind` as app data.

use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;

use crate::models::{
    CityFilter, CityRequest, CitySearchQuery, ColorRequest, IndustryFilter, IndustryRequest,
    LookupKind, LookupRequest, MessageResponse,
};
use crate::services::ReferenceService;
use crate::utils::{response, AppError};

/// GET /cities
pub async fn list_cities(
    query: web::Query<CityFilter>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    let (cities, pagination) = reference.list_cities(&query).await?;
    Ok(response::success_response(json!({
        "cities": cities,
        "pagination": pagination,
    })))
}

/// GET /cities/search
pub async fn search_cities(
    query: web::Query<CitySearchQuery>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    let cities = reference.search_cities(&query).await?;
    Ok(response::success_response(json!({ "cities": cities })))
}

/// GET /cities/{id}
pub async fn get_city(
    path: web::Path<i32>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    Ok(response::success_response(reference.get_city(path.into_inner()).await?))
}

pub async fn create_city(
    body: web::Json<CityRequest>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    Ok(response::created_response(reference.create_city(body.into_inner()).await?))
}

pub async fn update_city(
    path: web::Path<i32>,
    body: web::Json<CityRequest>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    let city = reference.update_city(path.into_inner(), body.into_inner()).await?;
    Ok(response::success_response(city))
}

pub async fn delete_city(
    path: web::Path<i32>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    reference.delete_city(path.into_inner()).await?;
    Ok(response::success_response(MessageResponse::new("City deleted")))
}

/// GET /industries
pub async fn list_industries(
    query: web::Query<IndustryFilter>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    let (industries, pagination) = reference.list_industries(&query).await?;
    Ok(response::success_response(json!({
        "industries": industries,
        "pagination": pagination,
    })))
}

/// GET /industries/{id}
pub async fn get_industry(
    path: web::Path<i32>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    Ok(response::success_response(reference.get_industry(path.into_inner()).await?))
}

pub async fn create_industry(
    body: web::Json<IndustryRequest>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    Ok(response::created_response(reference.create_industry(body.into_inner()).await?))
}

pub async fn update_industry(
    path: web::Path<i32>,
    body: web::Json<IndustryRequest>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    let industry = reference.update_industry(path.into_inner(), body.into_inner()).await?;
    Ok(response::success_response(industry))
}

/// PUT /industries/{id}/color
pub async fn update_industry_color(
    path: web::Path<i32>,
    body: web::Json<ColorRequest>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    let industry = reference
        .update_industry_color(path.into_inner(), body.into_inner())
        .await?;
    Ok(response::success_response(industry))
}

pub async fn delete_industry(
    path: web::Path<i32>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    reference.delete_industry(path.into_inner()).await?;
    Ok(response::success_response(MessageResponse::new("Industry deleted")))
}

pub async fn list_lookup(
    kind: web::Data<LookupKind>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    let items = reference.list_lookup(**kind).await?;
    Ok(response::success_response(json!({ kind.collection_key(): items })))
}

pub async fn get_lookup(
    kind: web::Data<LookupKind>,
    path: web::Path<i32>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    Ok(response::success_response(reference.get_lookup(**kind, path.into_inner()).await?))
}

pub async fn create_lookup(
    kind: web::Data<LookupKind>,
    body: web::Json<LookupRequest>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    let item = reference.create_lookup(**kind, body.into_inner()).await?;
    Ok(response::created_response(item))
}

pub async fn update_lookup(
    kind: web::Data<LookupKind>,
    path: web::Path<i32>,
    body: web::Json<LookupRequest>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    let item = reference
        .update_lookup(**kind, path.into_inner(), body.into_inner())
        .await?;
    Ok(response::success_response(item))
}

pub async fn delete_lookup(
    kind: web::Data<LookupKind>,
    path: web::Path<i32>,
    reference: web::Data<Arc<ReferenceService>>,
) -> Result<HttpResponse, AppError> {
    reference.delete_lookup(**kind, path.into_inner()).await?;
    let message = format!("{} deleted", kind.label());
    Ok(response::success_response(MessageResponse::new(&message)))
}
