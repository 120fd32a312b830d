use std::sync::Arc;

use validator::Validate;

use crate::database::DatabaseService;
use crate::models::{
    City, CityFilter, CityRequest, CitySearchQuery, ColorRequest, Dependent, Industry,
    IndustryFilter, IndustryRequest, LookupItem, LookupKind, LookupRequest, CITY_DEPENDENTS,
    INDUSTRY_DEPENDENTS,
};
use crate::utils::{AppError, PaginationMeta};

/// Cities, industries and the four lookup tables.
pub struct ReferenceService {
    pub db: Arc<DatabaseService>,
}

impl ReferenceService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn list_cities(&self, filter: &CityFilter) -> Result<(Vec<City>, PaginationMeta), AppError> {
        let (cities, total) = self.db.list_cities(filter).await?;
        Ok((cities, filter.page().meta(total)))
    }

    /// Autocomplete over name and region.
    pub async fn search_cities(&self, query: &CitySearchQuery) -> Result<Vec<City>, AppError> {
        let term = query.query.trim();
        if term.is_empty() {
            return Err(AppError::bad_request("Search query is required"));
        }
        let filter = CityFilter {
            search: Some(term.to_string()),
            page: Some(1),
            limit: Some(query.limit()),
            ..Default::default()
        };
        let (cities, _) = self.db.list_cities(&filter).await?;
        Ok(cities)
    }

    pub async fn get_city(&self, id: i32) -> Result<City, AppError> {
        self.db
            .get_city(id)
            .await?
            .ok_or_else(|| AppError::not_found("City not found"))
    }

    pub async fn create_city(&self, req: CityRequest) -> Result<City, AppError> {
        req.validate()?;
        self.db.create_city(&req).await.map_err(|e| conflict_as(e, "City already exists"))
    }

    pub async fn update_city(&self, id: i32, req: CityRequest) -> Result<City, AppError> {
        req.validate()?;
        self.db
            .update_city(id, &req)
            .await
            .map_err(|e| conflict_as(e, "City already exists"))?
            .ok_or_else(|| AppError::not_found("City not found"))
    }

    pub async fn delete_city(&self, id: i32) -> Result<(), AppError> {
        self.ensure_unreferenced("city", CITY_DEPENDENTS, id).await?;
        if !self.db.delete_city(id).await? {
            return Err(AppError::not_found("City not found"));
        }
        Ok(())
    }

    pub async fn list_industries(&self, filter: &IndustryFilter) -> Result<(Vec<Industry>, PaginationMeta), AppError> {
        let (industries, total) = self.db.list_industries(filter).await?;
        Ok((industries, filter.page().meta(total)))
    }

    pub async fn get_industry(&self, id: i32) -> Result<Industry, AppError> {
        self.db
            .get_industry(id)
            .await?
            .ok_or_else(|| AppError::not_found("Industry not found"))
    }

    pub async fn company_industries(&self, company_id: i32) -> Result<Vec<Industry>, AppError> {
        if !self.db.company_exists(company_id).await? {
            return Err(AppError::not_found("Company not found"));
        }
        Ok(self.db.industries_for_company(company_id).await?)
    }

    pub async fn create_industry(&self, req: IndustryRequest) -> Result<Industry, AppError> {
        req.validate()?;
        self.db
            .create_industry(&req)
            .await
            .map_err(|e| conflict_as(e, "Industry with this name already exists"))
    }

    pub async fn update_industry(&self, id: i32, req: IndustryRequest) -> Result<Industry, AppError> {
        req.validate()?;
        self.db
            .update_industry(id, &req)
            .await
            .map_err(|e| conflict_as(e, "Industry with this name already exists"))?
            .ok_or_else(|| AppError::not_found("Industry not found"))
    }

    pub async fn update_industry_color(&self, id: i32, req: ColorRequest) -> Result<Industry, AppError> {
        req.validate()?;
        self.db
            .update_industry_color(id, &req.color)
            .await?
            .ok_or_else(|| AppError::not_found("Industry not found"))
    }

    pub async fn delete_industry(&self, id: i32) -> Result<(), AppError> {
        self.ensure_unreferenced("industry", INDUSTRY_DEPENDENTS, id).await?;
        if !self.db.delete_industry(id).await? {
            return Err(AppError::not_found("Industry not found"));
        }
        Ok(())
    }

    pub async fn list_lookup(&self, kind: LookupKind) -> Result<Vec<LookupItem>, AppError> {
        Ok(self.db.list_lookup(kind).await?)
    }

    pub async fn get_lookup(&self, kind: LookupKind, id: i32) -> Result<LookupItem, AppError> {
        self.db
            .get_lookup(kind, id)
            .await?
            .ok_or_else(|| AppError::not_found(&format!("{} not found", kind.label())))
    }

    pub async fn create_lookup(&self, kind: LookupKind, req: LookupRequest) -> Result<LookupItem, AppError> {
        req.validate()?;
        self.db
            .create_lookup(kind, &req)
            .await
            .map_err(|e| conflict_as(e, &format!("{} with this name already exists", kind.label())))
    }

    pub async fn update_lookup(&self, kind: LookupKind, id: i32, req: LookupRequest) -> Result<LookupItem, AppError> {
        req.validate()?;
        self.db
            .update_lookup(kind, id, &req)
            .await
            .map_err(|e| conflict_as(e, &format!("{} with this name already exists", kind.label())))?
            .ok_or_else(|| AppError::not_found(&format!("{} not found", kind.label())))
    }

    pub async fn delete_lookup(&self, kind: LookupKind, id: i32) -> Result<(), AppError> {
        self.ensure_unreferenced(kind.label(), kind.dependents(), id).await?;
        if !self.db.delete_lookup(kind, id).await? {
            return Err(AppError::not_found(&format!("{} not found", kind.label())));
        }
        Ok(())
    }

    async fn ensure_unreferenced(&self, what: &str, dependents: &[Dependent], id: i32) -> Result<(), AppError> {
        let used_by = self.db.referencing_tables(dependents, id).await?;
        if used_by.is_empty() {
            return Ok(());
        }
        Err(AppError::conflict(&format!(
            "Cannot delete {}: it is still used by {}",
            what.to_lowercase(),
            used_by.join(", ")
        )))
    }
}

/// Unique violations get a message naming the entity; other errors map as usual.
fn conflict_as(err: crate::database::DbError, message: &str) -> AppError {
    if err.unique_violation().is_some() {
        AppError::conflict(message)
    } else {
        AppError::from(err)
    }
}
