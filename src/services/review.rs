use std::sync::Arc;

use validator::Validate;

use crate::database::{DatabaseService, ReviewTransition, UsefulMarkChange};
use crate::models::{
    mean_rating, AdminReviewUpdate, ModerationRequest, Review, ReviewFilter, ReviewRequest,
    ReviewScope, ReviewStatus, ReviewWithDetails, UsefulMarkResponse,
};
use crate::utils::{AppError, PaginationMeta};

/// Review submission, reading, useful marks and moderation.
pub struct ReviewService {
    pub db: Arc<DatabaseService>,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Validates every reference, then stores the review as pending.
    pub async fn create(&self, user_id: i32, req: ReviewRequest) -> Result<ReviewWithDetails, AppError> {
        req.validate()?;

        if !self.db.company_exists(req.company_id).await? {
            return Err(AppError::not_found("Company not found"));
        }
        if self.db.get_city(req.city_id).await?.is_none() {
            return Err(AppError::not_found("City not found"));
        }
        if !self.db.missing_ids("employment_types", &[req.employment_type_id]).await?.is_empty() {
            return Err(AppError::not_found("Employment type not found"));
        }
        if !self.db.missing_ids("employment_periods", &[req.employment_period_id]).await?.is_empty() {
            return Err(AppError::not_found("Employment period not found"));
        }

        let category_ids: Vec<i32> = req.category_ratings.keys().copied().collect();
        let missing = self.db.missing_ids("rating_categories", &category_ids).await?;
        if !missing.is_empty() {
            return Err(AppError::bad_request("Unknown rating categories")
                .with_details(missing.iter().map(|id| format!("category_ratings: {}", id)).collect()));
        }
        let missing = self.db.missing_ids("benefit_types", &req.benefit_type_ids).await?;
        if !missing.is_empty() {
            return Err(AppError::bad_request("Unknown benefit types")
                .with_details(missing.iter().map(|id| format!("benefit_type_ids: {}", id)).collect()));
        }

        let rating = mean_rating(&req.category_ratings);
        let review = self.db.create_review(user_id, &req, rating).await?;
        log::info!(
            "Review {} submitted by user {} for company {} (rating {})",
            review.id,
            user_id,
            review.company_id,
            rating
        );

        self.db
            .get_review_details(review.id, Some(user_id), false)
            .await?
            .ok_or_else(|| AppError::internal_server_error("Review disappeared after creation"))
    }

    /// Public read: anything not approved is reported as missing.
    pub async fn get_public(&self, id: i32, viewer: Option<i32>) -> Result<ReviewWithDetails, AppError> {
        self.db
            .get_review_details(id, viewer, true)
            .await?
            .ok_or_else(|| AppError::not_found("Review not found"))
    }

    pub async fn list_for_company(
        &self,
        company_id: i32,
        filter: &ReviewFilter,
        viewer: Option<i32>,
    ) -> Result<(Vec<ReviewWithDetails>, PaginationMeta), AppError> {
        if !self.db.company_exists(company_id).await? {
            return Err(AppError::not_found("Company not found"));
        }
        self.list(ReviewScope::Company(company_id), filter, viewer).await
    }

    pub async fn list_for_author(
        &self,
        user_id: i32,
        filter: &ReviewFilter,
    ) -> Result<(Vec<ReviewWithDetails>, PaginationMeta), AppError> {
        self.list(ReviewScope::Author(user_id), filter, Some(user_id)).await
    }

    pub async fn list_by_status(
        &self,
        status: ReviewStatus,
        filter: &ReviewFilter,
    ) -> Result<(Vec<ReviewWithDetails>, PaginationMeta), AppError> {
        self.list(ReviewScope::Status(status), filter, None).await
    }

    async fn list(
        &self,
        scope: ReviewScope,
        filter: &ReviewFilter,
        viewer: Option<i32>,
    ) -> Result<(Vec<ReviewWithDetails>, PaginationMeta), AppError> {
        if let (Some(min), Some(max)) = (filter.min_rating, filter.max_rating) {
            if min > max {
                return Err(AppError::bad_request("min_rating must not exceed max_rating"));
            }
        }
        let (reviews, total) = self.db.list_reviews(scope, filter, viewer).await?;
        Ok((reviews, filter.page().meta(total)))
    }

    pub async fn mark_useful(&self, user_id: i32, review_id: i32) -> Result<UsefulMarkResponse, AppError> {
        match self.db.add_useful_mark(user_id, review_id).await? {
            UsefulMarkChange::Done(resp) => Ok(resp),
            UsefulMarkChange::ReviewNotFound | UsefulMarkChange::NotMarked => {
                Err(AppError::not_found("Review not found"))
            }
        }
    }

    pub async fn unmark_useful(&self, user_id: i32, review_id: i32) -> Result<UsefulMarkResponse, AppError> {
        match self.db.remove_useful_mark(user_id, review_id).await? {
            UsefulMarkChange::Done(resp) => Ok(resp),
            UsefulMarkChange::ReviewNotFound => Err(AppError::not_found("Review not found")),
            UsefulMarkChange::NotMarked => {
                Err(AppError::bad_request("Review is not marked as useful"))
            }
        }
    }

    pub async fn approve(&self, id: i32, req: ModerationRequest) -> Result<Review, AppError> {
        if matches!(req.status, Some(s) if s != ReviewStatus::Approved) {
            return Err(AppError::bad_request("Status must be 'approved' for this endpoint"));
        }
        let comment = req
            .moderation_comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        self.transition(id, ReviewStatus::Approved, comment).await
    }

    /// Rejections must say why.
    pub async fn reject(&self, id: i32, req: ModerationRequest) -> Result<Review, AppError> {
        if matches!(req.status, Some(s) if s != ReviewStatus::Rejected) {
            return Err(AppError::bad_request("Status must be 'rejected' for this endpoint"));
        }
        let comment = match req.moderation_comment.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => return Err(AppError::bad_request("A moderation comment is required to reject a review")),
        };
        self.transition(id, ReviewStatus::Rejected, Some(comment)).await
    }

    async fn transition(
        &self,
        id: i32,
        target: ReviewStatus,
        comment: Option<&str>,
    ) -> Result<Review, AppError> {
        match self.db.moderate_review(id, target, comment).await? {
            ReviewTransition::Done(review) => Ok(review),
            ReviewTransition::NotFound => Err(AppError::not_found("Review not found")),
            ReviewTransition::NotPending(current) => Err(AppError::bad_request(&format!(
                "Only pending reviews can be moderated (current status: {})",
                current
            ))),
        }
    }

    pub async fn admin_update(&self, id: i32, patch: AdminReviewUpdate) -> Result<Review, AppError> {
        patch.validate()?;
        self.db
            .admin_update_review(id, &patch)
            .await?
            .ok_or_else(|| AppError::not_found("Review not found"))
    }

    pub async fn admin_delete(&self, id: i32) -> Result<(), AppError> {
        if !self.db.admin_delete_review(id).await? {
            return Err(AppError::not_found("Review not found"));
        }
        log::info!("Review {} deleted by admin", id);
        Ok(())
    }
}

