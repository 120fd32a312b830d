use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::database::DbError;

/// Error returned by services and handlers; rendered as the JSON error envelope.
#[derive(Debug, Clone)]
pub struct AppError {
    pub message: String,
    pub status_code: u16,
    pub details: Vec<String>,
}

impl AppError {
    pub fn new(message: &str, status_code: u16) -> Self {
        Self {
            message: message.to_string(),
            status_code,
            details: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new(message, 400)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(message, 401)
    }

    pub fn forbidden(message: &str) -> Self {
        Self::new(message, 403)
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(message, 404)
    }

    pub fn conflict(message: &str) -> Self {
        Self::new(message, 409)
    }

    pub fn too_many_requests(message: &str) -> Self {
        Self::new(message, 429)
    }

    pub fn internal_server_error(message: &str) -> Self {
        Self::new(message, 500)
    }

    /// Logs the real cause and hides it from the client.
    pub fn internal<E: fmt::Display>(context: &str, err: E) -> Self {
        log::error!("{}: {}", context, err);
        Self::internal_server_error("An internal error occurred")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        super::response::error_response(&self.message, self.status_code(), self.details.clone())
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        if let Some(constraint) = err.unique_violation() {
            log::warn!("Unique constraint violated: {}", constraint);
            return AppError::conflict("A record with the same unique value already exists");
        }
        if err.foreign_key_violation().is_some() {
            return AppError::conflict("The record is referenced by other data");
        }
        AppError::internal("Database error", err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::bad_request("Validation failed").with_details(flatten_validation_errors(&errors))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::internal("Password hashing failed", err)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::internal("Token encoding failed", err)
    }
}

impl From<getrandom::Error> for AppError {
    fn from(err: getrandom::Error) -> Self {
        AppError::internal("OS random generator failed", err)
    }
}

/// One `"field: message"` line per failed rule, sorted for stable output.
pub fn flatten_validation_errors(err: &validator::ValidationErrors) -> Vec<String> {
    let mut msgs = Vec::new();
    for (field, errors) in err.field_errors().iter() {
        for e in errors.iter() {
            let message = match &e.message {
                Some(m) => format!("{}: {}", field, m),
                None => format!("{}: {}", field, e.code),
            };
            msgs.push(message);
        }
    }
    msgs.sort();
    msgs
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn validation_errors_become_bad_request_with_details() {
        let probe = Probe {
            name: "ab".into(),
            email: "nope".into(),
        };
        let err: AppError = probe.validate().unwrap_err().into();
        assert_eq!(err.status_code, 400);
        assert_eq!(err.details, vec!["email: email".to_string(), "name: too short".to_string()]);
    }

    #[test]
    fn status_codes_map_to_http() {
        assert_eq!(AppError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::new("x", 1000).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
