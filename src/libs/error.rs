//! Error types for the EMR API

use crate::libs::models::EntityKind;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use uuid::Uuid;

/// Errors returned by the store and the schema mapper.
#[derive(Error, Debug)]
pub enum EmrError {
    #[error("{0} not found")]
    NotFound(EntityKind),

    #[error("{field} {id} does not reference an existing {kind}")]
    ReferenceNotFound {
        field: &'static str,
        kind: EntityKind,
        id: Uuid,
    },

    /// The database could not be reached at all.
    #[error("DB connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// The database answered, but a catalog query failed during mapping.
    #[error("database mapping failed: {0}")]
    MappingFailed(#[source] sqlx::Error),

    #[error("no database is configured; set the POSTGRES_* environment variables")]
    DatabaseNotConfigured,
}

/// Result type for store and mapper operations
pub type Result<T> = std::result::Result<T, EmrError>;

impl EmrError {
    pub fn error_code(&self) -> &'static str {
        match self {
            EmrError::NotFound(_) => "NOT_FOUND",
            EmrError::ReferenceNotFound { .. } => "REFERENCE_NOT_FOUND",
            EmrError::ConnectionFailed(_) => "CONNECTION_FAILED",
            EmrError::MappingFailed(_) => "MAPPING_FAILED",
            EmrError::DatabaseNotConfigured => "DATABASE_NOT_CONFIGURED",
        }
    }
}

/// JSON body shared by every error the API returns.
pub fn error_body(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "status": "error",
        "error": {
            "code": code,
            "message": message
        }
    })
}

impl ResponseError for EmrError {
    fn status_code(&self) -> StatusCode {
        match self {
            EmrError::NotFound(_) => StatusCode::NOT_FOUND,
            EmrError::ReferenceNotFound { .. } => StatusCode::BAD_REQUEST,
            EmrError::ConnectionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            EmrError::MappingFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EmrError::DatabaseNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("application/json")
            .json(error_body(self.error_code(), &self.to_string()))
    }
}
