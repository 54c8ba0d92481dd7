//! HTTP error mapping for store failures

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use contracts::StoreError;
use serde_json::json;

/// Error returned by every API handler
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Data not found")]
    NotFound,

    /// Rejected request parameters or body
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => Self::NotFound,
            StoreError::InvalidQuery { message } => Self::Invalid(message),
            e @ StoreError::Constraint { .. } => Self::Invalid(e.to_string()),
            e => Self::Store(e),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Self::Store(e) = self {
            tracing::error!(error = %e, "Store request failed");
        }
        HttpResponse::build(self.status_code()).json(json!({ "detail": self.to_string() }))
    }
}
