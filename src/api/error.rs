use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access code expired")]
    Expired,

    #[error("Work has no content")]
    NoContent,

    #[error("Storage failure: {details}")]
    Storage { message: String, details: String },

    #[error("Failed to generate unique access code")]
    ExhaustedRetries,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            // Expired and NoContent share NotFound's status code so a probe
            // cannot tell which codes have ever existed.
            AppError::Expired => (
                StatusCode::NOT_FOUND,
                json!({ "error": "This access code has expired" }),
            ),
            AppError::NoContent => (
                StatusCode::NOT_FOUND,
                json!({ "error": "This work has no content attached" }),
            ),
            AppError::Storage { message, details } => {
                tracing::error!("Storage failure: {}", details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": message, "details": details }),
                )
            }
            AppError::ExhaustedRetries => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to generate unique access code" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
