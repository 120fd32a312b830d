use std::sync::Arc;

use validator::Validate;

use crate::database::DatabaseService;
use crate::models::{Suggestion, SuggestionFilter, SuggestionRequest};
use crate::utils::{AppError, PaginationMeta};

pub struct SuggestionService {
    pub db: Arc<DatabaseService>,
}

impl SuggestionService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn submit(&self, req: SuggestionRequest) -> Result<Suggestion, AppError> {
        req.validate()?;
        let suggestion = self.db.create_suggestion(&req).await?;
        log::info!("Suggestion {} received ({})", suggestion.id, suggestion.kind.as_str());
        Ok(suggestion)
    }

    pub async fn list(&self, filter: &SuggestionFilter) -> Result<(Vec<Suggestion>, PaginationMeta), AppError> {
        let (items, total) = self.db.list_suggestions(filter).await?;
        Ok((items, filter.page().meta(total)))
    }

    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        if !self.db.delete_suggestion(id).await? {
            return Err(AppError::not_found("Suggestion not found"));
        }
        Ok(())
    }
}
