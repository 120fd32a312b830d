use serde::{Deserialize, Serialize};

pub mod error;
pub mod slug;
pub mod validation;

pub use error::AppError;

/// Normalized page/limit pair shared by every listing endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    /// Missing or non-positive values fall back to page 1 / limit 10; limit is capped at 100.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT);
        Self { page, limit }
    }

    /// Pages far past the end saturate and simply come back empty.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn meta(&self, total: i64) -> PaginationMeta {
        PaginationMeta {
            total,
            page: self.page,
            limit: self.limit,
            pages: total / self.limit + i64::from(total % self.limit != 0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

/// Sorting direction
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Mask sensitive values partially (e.g., tokens, emails)
pub fn mask_sensitive(value: &str) -> String {
    if value.is_empty() {
        return "".to_string();
    }

    if let Some(idx) = value.find('@') {
        let (local, domain) = value.split_at(idx);
        let visible: String = local.chars().take(if local.chars().count() <= 2 { 1 } else { 2 }).collect();
        return format!("{}***{}", visible, domain);
    }

    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return format!("{}***", chars[0]);
    }

    let start: String = chars[..4].iter().collect();
    let end: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", start, end)
}

/// Hash string using SHA-256
pub fn hash_string(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Opaque hex token built from `bytes` bytes of OS randomness.
pub fn generate_token(bytes: usize) -> Result<String, getrandom::Error> {
    let mut buf = vec![0u8; bytes];
    getrandom::getrandom(&mut buf)?;
    Ok(buf.iter().map(|b| format!("{:02x}", b)).collect())
}

/// Logging helpers
pub mod logging {
    use log::LevelFilter;

    pub fn level_from_string(level: &str) -> LevelFilter {
        match level.to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        }
    }

    /// Plain stderr logging for the command line tools.
    pub fn init_console(level: &str) {
        let _ = env_logger::builder()
            .filter_level(level_from_string(level))
            .format_timestamp_secs()
            .try_init();
    }

    /// flexi_logger into `directory`, duplicated to stdout; env_logger if that fails.
    /// Keep the returned handle alive for the lifetime of the process.
    pub fn init(level: &str, directory: &str) -> Option<flexi_logger::LoggerHandle> {
        let started = flexi_logger::Logger::try_with_str(level).and_then(|logger| {
            logger
                .log_to_file(
                    flexi_logger::FileSpec::default()
                        .directory(directory)
                        .suppress_timestamp(),
                )
                .duplicate_to_stdout(flexi_logger::Duplicate::Info)
                .start()
        });

        match started {
            Ok(handle) => Some(handle),
            Err(err) => {
                env_logger::builder()
                    .filter_level(level_from_string(level))
                    .format_timestamp_secs()
                    .init();
                log::warn!("File logging unavailable ({}), logging to stderr", err);
                None
            }
        }
    }
}

/// Response helpers
pub mod response {
    use actix_web::http::StatusCode;
    use actix_web::HttpResponse;
    use serde::Serialize;

    use crate::models::ApiResponse;

    pub fn json_response<T: Serialize>(data: T, status: StatusCode) -> HttpResponse {
        HttpResponse::build(status)
            .content_type("application/json")
            .json(ApiResponse::success(data))
    }

    pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
        json_response(data, StatusCode::OK)
    }

    pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
        json_response(data, StatusCode::CREATED)
    }

    pub fn error_response(message: &str, status: StatusCode, details: Vec<String>) -> HttpResponse {
        HttpResponse::build(status)
            .content_type("application/json")
            .json(ApiResponse::<()>::error(message.to_string(), details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_caps() {
        assert_eq!(Page::new(None, None), Page { page: 1, limit: 10 });
        assert_eq!(Page::new(Some(0), Some(-5)), Page { page: 1, limit: 10 });
        assert_eq!(Page::new(Some(3), Some(500)), Page { page: 3, limit: 100 });
        assert_eq!(Page::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn page_meta_rounds_pages_up() {
        let page = Page::new(Some(1), Some(10));
        assert_eq!(page.meta(0).pages, 0);
        assert_eq!(page.meta(10).pages, 1);
        assert_eq!(page.meta(11).pages, 2);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let page = Page::new(Some(i64::MAX), Some(100));
        assert_eq!(page.page, i64::MAX);
        assert_eq!(page.offset(), i64::MAX);
        assert_eq!(page.meta(i64::MAX).pages, i64::MAX / 100 + 1);
    }

    #[test]
    fn masks_emails_and_tokens() {
        assert_eq!(mask_sensitive("ivan@example.com"), "iv***@example.com");
        assert_eq!(mask_sensitive("a@b.c"), "a***@b.c");
        assert_eq!(mask_sensitive("abcdef123456"), "abcd***3456");
        assert_eq!(mask_sensitive("xyz"), "x***");
        assert_eq!(mask_sensitive(""), "");
    }

    #[test]
    fn generated_tokens_are_unique_hex() {
        let a = generate_token(32).unwrap();
        let b = generate_token(32).unwrap();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert_eq!(hash_string(&a).len(), 64);
    }
}
