use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use crate::utils::{Page, SortOrder};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionType {
    /// "Please add this company"
    Company,
    /// Free-form product feedback
    Suggestion,
}

impl SuggestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionType::Company => "company",
            SuggestionType::Suggestion => "suggestion",
        }
    }
}

impl FromStr for SuggestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "company" => Ok(SuggestionType::Company),
            "suggestion" => Ok(SuggestionType::Suggestion),
            other => Err(format!("unknown suggestion type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: SuggestionType,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SuggestionRequest {
    #[serde(rename = "type")]
    pub kind: SuggestionType,

    #[validate(length(min = 5, max = 2000, message = "Text must be 5-2000 characters"))]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionFilter {
    #[serde(rename = "type")]
    pub kind: Option<SuggestionType>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl SuggestionFilter {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}
