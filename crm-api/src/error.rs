use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use shared_types::{ErrorResponse, ParseEnumError};

#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    /// Carries the entity label, e.g. "Company" or "Related deal"
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    UnsupportedRelation(#[from] ParseEnumError),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl CrmError {
    pub fn not_found(label: impl Into<String>) -> Self {
        CrmError::NotFound(label.into())
    }
}

impl From<rusqlite::Error> for CrmError {
    fn from(e: rusqlite::Error) -> Self {
        CrmError::Database(e.to_string())
    }
}

impl From<r2d2::Error> for CrmError {
    fn from(e: r2d2::Error) -> Self {
        CrmError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for CrmError {
    fn from(e: serde_json::Error) -> Self {
        CrmError::Database(e.to_string())
    }
}

impl actix_web::error::ResponseError for CrmError {
    fn status_code(&self) -> StatusCode {
        match self {
            CrmError::Validation(_) | CrmError::UnsupportedRelation(_) => StatusCode::BAD_REQUEST,
            CrmError::Duplicate(_) => StatusCode::CONFLICT,
            CrmError::NotFound(_) => StatusCode::NOT_FOUND,
            CrmError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            CrmError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let CrmError::Database(msg) = self {
            tracing::error!("{}", msg);
        }
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}
