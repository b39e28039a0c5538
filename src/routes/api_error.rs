use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use crate::services::OrchestratorError;

/// Failures surfaced to API callers as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Scraping already in progress")]
    Busy,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
    #[error("upload failed: {0}")]
    Multipart(#[from] actix_multipart::MultipartError),
}

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        match e {
            OrchestratorError::Busy => ApiError::Busy,
            OrchestratorError::Storage(e) => ApiError::Database(e),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Busy => StatusCode::CONFLICT,
            ApiError::BadRequest(_) | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("Request failed: {:?}", self);
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_maps_to_conflict() {
        let error: ApiError = OrchestratorError::Busy.into();
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert_eq!(error.to_string(), "Scraping already in progress");
    }

    #[test]
    fn client_mistakes_are_bad_requests() {
        let error = ApiError::BadRequest("No file provided".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("job").status_code(), StatusCode::NOT_FOUND);
    }
}
