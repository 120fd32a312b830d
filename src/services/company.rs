use std::sync::Arc;

use validator::Validate;

use crate::database::DatabaseService;
use crate::models::{CompanyFilter, CompanyRequest, CompanyWithRatings};
use crate::utils::{AppError, PaginationMeta};

pub struct CompanyService {
    pub db: Arc<DatabaseService>,
}

impl CompanyService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: &CompanyFilter) -> Result<(Vec<CompanyWithRatings>, PaginationMeta), AppError> {
        let industry_ids = filter.industry_ids().map_err(|e| AppError::bad_request(&e))?;
        if matches!(filter.min_rating, Some(r) if !(0.0..=5.0).contains(&r)) {
            return Err(AppError::bad_request("min_rating must be between 0 and 5"));
        }

        let (companies, total) = self.db.list_companies(filter, industry_ids).await?;
        Ok((companies, filter.page().meta(total)))
    }

    /// Numeric keys are ids, anything else is a slug.
    pub async fn get(&self, id_or_slug: &str) -> Result<CompanyWithRatings, AppError> {
        let company = match id_or_slug.parse::<i32>() {
            Ok(id) => self.db.get_company_by_id(id).await?,
            Err(_) => self.db.get_company_by_slug(id_or_slug).await?,
        };
        company.ok_or_else(|| AppError::not_found("Company not found"))
    }

    pub async fn create(&self, req: CompanyRequest) -> Result<CompanyWithRatings, AppError> {
        req.validate()?;
        self.check_references(&req).await?;
        Ok(self.db.create_company(&req).await?)
    }

    pub async fn update(&self, id: i32, req: CompanyRequest) -> Result<CompanyWithRatings, AppError> {
        req.validate()?;
        self.check_references(&req).await?;
        self.db
            .update_company(id, &req)
            .await?
            .ok_or_else(|| AppError::not_found("Company not found"))
    }

    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        if !self.db.delete_company(id).await? {
            return Err(AppError::not_found("Company not found"));
        }
        log::info!("Company {} deleted", id);
        Ok(())
    }

    async fn check_references(&self, req: &CompanyRequest) -> Result<(), AppError> {
        let missing = self.db.missing_ids("industries", &req.industries).await?;
        if !missing.is_empty() {
            return Err(AppError::bad_request("Unknown industries")
                .with_details(missing.iter().map(|id| format!("industries: {}", id)).collect()));
        }
        if let Some(city_id) = req.city_id {
            if self.db.get_city(city_id).await?.is_none() {
                return Err(AppError::bad_request("City not found"));
            }
        }
        Ok(())
    }
}
