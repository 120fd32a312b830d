use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use super::company::CompanySummary;
use super::reference::{City, LookupItem};
use crate::utils::{Page, SortOrder};

/// Moderation state. `Pending` is the only state a moderator may act on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }

    pub fn can_moderate(&self) -> bool {
        *self == ReviewStatus::Pending
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            other => Err(format!("unknown review status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i32,
    pub user_id: i32,
    pub company_id: i32,
    pub position: String,
    pub employment_type_id: Option<i32>,
    pub employment_period_id: Option<i32>,
    pub city_id: Option<i32>,
    pub rating: f64,
    pub pros: String,
    pub cons: String,
    pub is_former_employee: bool,
    pub is_recommended: bool,
    pub status: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderation_comment: Option<String>,
    pub useful_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewCategoryRating {
    pub category_id: i32,
    pub category: String,
    pub rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewBenefit {
    pub benefit_type_id: i32,
    pub benefit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewWithDetails {
    pub review: Review,
    pub category_ratings: Vec<ReviewCategoryRating>,
    pub benefits: Vec<ReviewBenefit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<CompanySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<City>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<LookupItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_period: Option<LookupItem>,
    pub is_marked_as_useful: bool,
}

/// Review submission
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(range(min = 1, message = "company_id must be positive"))]
    pub company_id: i32,

    #[validate(length(min = 2, max = 100, message = "Position must be 2-100 characters"))]
    pub position: String,

    #[validate(range(min = 1, message = "employment_type_id must be positive"))]
    pub employment_type_id: i32,

    #[validate(range(min = 1, message = "employment_period_id must be positive"))]
    pub employment_period_id: i32,

    #[validate(range(min = 1, message = "city_id must be positive"))]
    pub city_id: i32,

    /// category id -> score
    #[validate(custom(function = "validate_category_ratings"))]
    pub category_ratings: HashMap<i32, f64>,

    #[validate(length(min = 10, max = 5000, message = "Pros must be 10-5000 characters"))]
    pub pros: String,

    #[validate(length(min = 10, max = 5000, message = "Cons must be 10-5000 characters"))]
    pub cons: String,

    #[serde(default)]
    pub benefit_type_ids: Vec<i32>,

    #[serde(default)]
    pub is_former_employee: bool,

    #[serde(default)]
    pub is_recommended: bool,
}

fn validate_category_ratings(ratings: &HashMap<i32, f64>) -> Result<(), ValidationError> {
    if ratings.is_empty() {
        let mut err = ValidationError::new("category_ratings_required");
        err.message = Some("At least one category rating is required".into());
        return Err(err);
    }
    if ratings.iter().any(|(id, score)| *id < 1 || !(1.0..=5.0).contains(score)) {
        let mut err = ValidationError::new("category_rating_range");
        err.message = Some("Category ratings must be between 1 and 5".into());
        return Err(err);
    }
    Ok(())
}

/// Mean of the category scores rounded to one decimal place; 0 when empty.
pub fn mean_rating(ratings: &HashMap<i32, f64>) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: f64 = ratings.values().sum();
    let mean = sum / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSort {
    Rating,
    #[default]
    CreatedAt,
    UsefulCount,
}

impl ReviewSort {
    pub fn column(&self) -> &'static str {
        match self {
            ReviewSort::Rating => "r.rating",
            ReviewSort::CreatedAt => "r.created_at",
            ReviewSort::UsefulCount => "r.useful_count",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewFilter {
    pub city_id: Option<i32>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
    pub is_former_employee: Option<bool>,
    pub sort_by: Option<ReviewSort>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ReviewFilter {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

/// Which reviews a listing query selects.
#[derive(Debug, Clone, Copy)]
pub enum ReviewScope {
    /// Approved reviews of one company
    Company(i32),
    /// All reviews written by one user, any status
    Author(i32),
    /// Moderation queue for one status
    Status(ReviewStatus),
}

/// Body of approve/reject. `status`, when sent, must agree with the endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModerationRequest {
    pub status: Option<ReviewStatus>,
    pub moderation_comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AdminReviewUpdate {
    #[validate(length(min = 2, max = 100, message = "Position must be 2-100 characters"))]
    pub position: Option<String>,

    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1 and 5"))]
    pub rating: Option<f64>,

    #[validate(length(min = 10, max = 5000, message = "Pros must be 10-5000 characters"))]
    pub pros: Option<String>,

    #[validate(length(min = 10, max = 5000, message = "Cons must be 10-5000 characters"))]
    pub cons: Option<String>,

    pub is_former_employee: Option<bool>,
    pub is_recommended: Option<bool>,
    pub status: Option<ReviewStatus>,
    pub moderation_comment: Option<String>,
}

impl AdminReviewUpdate {
    /// Applies the patch in place. Moving into `Approved` stamps `approved_at`.
    pub fn apply(&self, review: &mut Review, now: DateTime<Utc>) {
        if let Some(position) = &self.position {
            review.position = position.clone();
        }
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        if let Some(pros) = &self.pros {
            review.pros = pros.clone();
        }
        if let Some(cons) = &self.cons {
            review.cons = cons.clone();
        }
        if let Some(former) = self.is_former_employee {
            review.is_former_employee = former;
        }
        if let Some(recommended) = self.is_recommended {
            review.is_recommended = recommended;
        }
        if let Some(status) = self.status {
            if status == ReviewStatus::Approved && review.status != ReviewStatus::Approved {
                review.approved_at = Some(now);
            }
            review.status = status;
        }
        if let Some(comment) = &self.moderation_comment {
            review.moderation_comment = Some(comment.clone());
        }
        review.updated_at = now;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsefulMarkResponse {
    pub review_id: i32,
    pub useful_count: i32,
    pub is_marked_as_useful: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_review() -> Review {
        let now = Utc::now();
        Review {
            id: 1,
            user_id: 2,
            company_id: 3,
            position: "Engineer".into(),
            employment_type_id: Some(1),
            employment_period_id: Some(1),
            city_id: Some(1),
            rating: 4.0,
            pros: "good team and tasks".into(),
            cons: "long commute to office".into(),
            is_former_employee: false,
            is_recommended: true,
            status: ReviewStatus::Pending,
            moderation_comment: None,
            useful_count: 0,
            created_at: now,
            updated_at: now,
            approved_at: None,
        }
    }

    #[test]
    fn mean_rating_rounds_to_one_decimal() {
        let ratings: HashMap<i32, f64> = [(1, 4.0), (2, 5.0), (3, 4.0)].into_iter().collect();
        assert_eq!(mean_rating(&ratings), 4.3);

        let ratings: HashMap<i32, f64> = [(1, 3.0), (2, 4.0)].into_iter().collect();
        assert_eq!(mean_rating(&ratings), 3.5);

        assert_eq!(mean_rating(&HashMap::new()), 0.0);
    }

    #[test]
    fn only_pending_reviews_are_moderated() {
        assert!(ReviewStatus::Pending.can_moderate());
        assert!(!ReviewStatus::Approved.can_moderate());
        assert!(!ReviewStatus::Rejected.can_moderate());
    }

    #[test]
    fn admin_update_stamps_approval_once() {
        let mut review = sample_review();
        let first = Utc::now();
        let patch = AdminReviewUpdate {
            status: Some(ReviewStatus::Approved),
            rating: Some(2.5),
            ..Default::default()
        };
        patch.apply(&mut review, first);
        assert_eq!(review.status, ReviewStatus::Approved);
        assert_eq!(review.approved_at, Some(first));
        assert_eq!(review.rating, 2.5);

        let later = first + chrono::Duration::minutes(5);
        patch.apply(&mut review, later);
        assert_eq!(review.approved_at, Some(first));
        assert_eq!(review.updated_at, later);
    }

    #[test]
    fn category_ratings_out_of_range_fail_validation() {
        let mut ratings = HashMap::new();
        ratings.insert(1, 6.0);
        assert!(validate_category_ratings(&ratings).is_err());
        ratings.insert(1, 4.5);
        assert!(validate_category_ratings(&ratings).is_ok());
        assert!(validate_category_ratings(&HashMap::new()).is_err());
    }

    #[test]
    fn category_rating_keys_parse_from_json_strings() {
        let body = serde_json::json!({
            "company_id": 1,
            "position": "QA",
            "employment_type_id": 1,
            "employment_period_id": 2,
            "city_id": 3,
            "category_ratings": {"1": 5, "2": 3.5},
            "pros": "friendly colleagues",
            "cons": "outdated hardware"
        });
        let req: ReviewRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.category_ratings.get(&2), Some(&3.5));
        assert!(req.benefit_type_ids.is_empty());
        assert!(req.validate().is_ok());
    }
}
