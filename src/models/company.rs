use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use super::reference::{City, Industry};
use crate::utils::{Page, SortOrder};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompanySize {
    Small,
    Medium,
    Large,
    Enterprise,
}

impl CompanySize {
    pub const ALL: [CompanySize; 4] = [
        CompanySize::Small,
        CompanySize::Medium,
        CompanySize::Large,
        CompanySize::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompanySize::Small => "small",
            CompanySize::Medium => "medium",
            CompanySize::Large => "large",
            CompanySize::Enterprise => "enterprise",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CompanySize::Small => "up to 50 employees",
            CompanySize::Medium => "50-200 employees",
            CompanySize::Large => "200-1000 employees",
            CompanySize::Enterprise => "more than 1000 employees",
        }
    }
}

impl FromStr for CompanySize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompanySize::ALL
            .into_iter()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| format!("unknown company size: {}", s))
    }
}

/// Entry of the `company_sizes` list returned next to company listings.
#[derive(Debug, Clone, Serialize)]
pub struct CompanySizeOption {
    pub value: CompanySize,
    pub description: &'static str,
}

impl CompanySize {
    pub fn options() -> Vec<CompanySizeOption> {
        CompanySize::ALL
            .iter()
            .map(|size| CompanySizeOption {
                value: *size,
                description: size.description(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub size: CompanySize,
    pub logo: String,
    pub website: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city_id: Option<i32>,
    pub reviews_count: i32,
    pub average_rating: f64,
    pub recommendation_percentage: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyCategoryRating {
    pub category_id: i32,
    pub category: String,
    pub rating: f64,
}

/// A company together with everything the detail page shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyWithRatings {
    pub company: Company,
    pub category_ratings: Vec<CompanyCategoryRating>,
    pub industries: Vec<Industry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<City>,
}

/// Short reference embedded in review listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySummary {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompanyRequest {
    #[validate(length(min = 2, max = 255, message = "Name must be 2-255 characters"))]
    pub name: String,

    pub size: CompanySize,

    #[validate(url(message = "Logo must be a valid URL"))]
    pub logo: Option<String>,

    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 50, message = "Phone is too long"))]
    pub phone: Option<String>,

    pub address: Option<String>,

    #[validate(range(min = 1, message = "city_id must be positive"))]
    pub city_id: Option<i32>,

    #[validate(length(min = 1, message = "At least one industry is required"))]
    pub industries: Vec<i32>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompanySort {
    Name,
    #[default]
    Rating,
    ReviewsCount,
    CreatedAt,
}

impl CompanySort {
    pub fn column(&self) -> &'static str {
        match self {
            CompanySort::Name => "c.name",
            CompanySort::Rating => "c.average_rating",
            CompanySort::ReviewsCount => "c.reviews_count",
            CompanySort::CreatedAt => "c.created_at",
        }
    }
}

/// Query string of `GET /companies`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyFilter {
    pub search: Option<String>,
    /// Comma separated industry ids
    pub industries: Option<String>,
    pub size: Option<CompanySize>,
    pub min_rating: Option<f64>,
    pub city_id: Option<i32>,
    pub city: Option<String>,
    pub sort_by: Option<CompanySort>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl CompanyFilter {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }

    /// Parses the `industries` list, ignoring non-positive ids.
    pub fn industry_ids(&self) -> Result<Vec<i32>, String> {
        let raw = match self.industries.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(Vec::new()),
        };
        raw.split(',')
            .map(|part| {
                part.trim()
                    .parse::<i32>()
                    .map_err(|_| format!("invalid industry id: {}", part.trim()))
            })
            .filter(|id| !matches!(id, Ok(v) if *v <= 0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn industry_list_parsing() {
        let mut filter = CompanyFilter {
            industries: Some("3, 7,0,12".into()),
            ..Default::default()
        };
        assert_eq!(filter.industry_ids().unwrap(), vec![3, 7, 12]);

        filter.industries = Some("4".into());
        assert_eq!(filter.industry_ids().unwrap(), vec![4]);

        filter.industries = Some("4,x".into());
        assert!(filter.industry_ids().is_err());

        filter.industries = None;
        assert!(filter.industry_ids().unwrap().is_empty());
    }

    #[test]
    fn size_parsing_matches_serde_names() {
        assert_eq!("enterprise".parse::<CompanySize>().unwrap(), CompanySize::Enterprise);
        assert!("huge".parse::<CompanySize>().is_err());
        let json = serde_json::to_string(&CompanySize::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }
}
