use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::validation::validate_hex_color;
use crate::utils::{Page, SortOrder};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct City {
    pub id: i32,
    pub name: String,
    pub region: String,
    pub country: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CityRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,

    #[validate(length(max = 100, message = "Region is too long"))]
    pub region: Option<String>,

    #[validate(length(min = 2, max = 100, message = "Country must be 2-100 characters"))]
    pub country: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CitySort {
    #[default]
    Name,
    Region,
}

impl CitySort {
    pub fn column(&self) -> &'static str {
        match self {
            CitySort::Name => "name",
            CitySort::Region => "region",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CityFilter {
    pub search: Option<String>,
    pub country: Option<String>,
    pub sort_by: Option<CitySort>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl CityFilter {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

/// `GET /cities/search?query=..&limit=..`
#[derive(Debug, Clone, Deserialize)]
pub struct CitySearchQuery {
    #[serde(default)]
    pub query: String,
    pub limit: Option<i64>,
}

impl CitySearchQuery {
    pub fn limit(&self) -> i64 {
        match self.limit {
            Some(l) if l > 0 => l.min(Page::MAX_LIMIT),
            _ => 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Industry {
    pub id: i32,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IndustryRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,

    #[validate(custom(function = "validate_hex_color"))]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ColorRequest {
    #[validate(custom(function = "validate_hex_color"))]
    pub color: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndustryFilter {
    pub search: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl IndustryFilter {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

/// Row of one of the simple id/name/description lookup tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupItem {
    pub id: i32,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LookupRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,

    #[validate(length(max = 255, message = "Description is too long"))]
    pub description: Option<String>,
}

/// A table that other rows reference, checked before a lookup row may be deleted.
#[derive(Debug, Clone, Copy)]
pub struct Dependent {
    pub table: &'static str,
    pub column: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    RatingCategory,
    BenefitType,
    EmploymentType,
    EmploymentPeriod,
}

impl LookupKind {
    pub fn table(&self) -> &'static str {
        match self {
            LookupKind::RatingCategory => "rating_categories",
            LookupKind::BenefitType => "benefit_types",
            LookupKind::EmploymentType => "employment_types",
            LookupKind::EmploymentPeriod => "employment_periods",
        }
    }

    /// Key of the list in JSON responses, e.g. `{"benefit_types": [...]}`.
    pub fn collection_key(&self) -> &'static str {
        self.table()
    }

    pub fn label(&self) -> &'static str {
        match self {
            LookupKind::RatingCategory => "Rating category",
            LookupKind::BenefitType => "Benefit type",
            LookupKind::EmploymentType => "Employment type",
            LookupKind::EmploymentPeriod => "Employment period",
        }
    }

    pub fn dependents(&self) -> &'static [Dependent] {
        match self {
            LookupKind::RatingCategory => &[
                Dependent { table: "review_category_ratings", column: "category_id", label: "review ratings" },
                Dependent { table: "company_category_ratings", column: "category_id", label: "company ratings" },
            ],
            LookupKind::BenefitType => &[
                Dependent { table: "review_benefits", column: "benefit_type_id", label: "reviews" },
            ],
            LookupKind::EmploymentType => &[
                Dependent { table: "reviews", column: "employment_type_id", label: "reviews" },
            ],
            LookupKind::EmploymentPeriod => &[
                Dependent { table: "reviews", column: "employment_period_id", label: "reviews" },
            ],
        }
    }
}

pub const CITY_DEPENDENTS: &[Dependent] = &[
    Dependent { table: "companies", column: "city_id", label: "companies" },
    Dependent { table: "reviews", column: "city_id", label: "reviews" },
];

pub const INDUSTRY_DEPENDENTS: &[Dependent] = &[
    Dependent { table: "company_industries", column: "industry_id", label: "companies" },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_search_limit_is_clamped() {
        let q = CitySearchQuery { query: "mos".into(), limit: None };
        assert_eq!(q.limit(), 20);
        let q = CitySearchQuery { query: "mos".into(), limit: Some(500) };
        assert_eq!(q.limit(), 100);
        let q = CitySearchQuery { query: "mos".into(), limit: Some(-3) };
        assert_eq!(q.limit(), 20);
    }

    #[test]
    fn every_lookup_has_dependents() {
        for kind in [
            LookupKind::RatingCategory,
            LookupKind::BenefitType,
            LookupKind::EmploymentType,
            LookupKind::EmploymentPeriod,
        ] {
            assert!(!kind.dependents().is_empty(), "{:?}", kind);
        }
    }

    #[test]
    fn color_must_be_hex() {
        assert!(ColorRequest { color: "#FF5733".into() }.validate().is_ok());
        assert!(ColorRequest { color: "#abc".into() }.validate().is_ok());
        assert!(ColorRequest { color: "FF5733".into() }.validate().is_err());
        assert!(ColorRequest { color: "#GG0000".into() }.validate().is_err());
    }
}
