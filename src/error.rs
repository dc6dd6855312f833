use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::clients::ClientError;
use crate::models::ApiResponse;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Backend error: {0}")]
    Backend(#[from] ClientError),

    #[error("Report error: {0}")]
    Report(#[from] csv::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::Validation(errors.to_string())
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Database(_) | ServiceError::Report(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Backend(ClientError::Rejected { status, .. })
                if (400..500).contains(status) =>
            {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Storage and upstream details stay in the log, not the response body.
        let message = match self {
            ServiceError::Database(_) => "Database operation failed".to_string(),
            ServiceError::Backend(ClientError::Rejected { message, .. }) => message.clone(),
            ServiceError::Backend(_) => "Backend request failed".to_string(),
            ServiceError::Report(_) => "Failed to render report".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::error(message))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
