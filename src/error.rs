use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_with::skip_serializing_none;
use thiserror::Error;
use tracing::error;

use crate::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
    #[error("The given data was invalid.")]
    Validation(FieldErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("No query results for trip {0}")]
    TripNotFound(String),
    #[error("Not allowed to access")]
    NotAllowed,
    #[error("Unauthenticated.")]
    Unauthorized,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    code: Option<&'static str>,
    errors: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Database(err) => {
                error!("persistence failure: {err:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, Some("persistence_error"))
            }
            AppError::Config(_) | AppError::Io(_) | AppError::Other(_) => {
                error!("internal failure: {self:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, Some("internal_error"))
            }
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, None),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            AppError::TripNotFound(_) => (StatusCode::NOT_FOUND, None),
            // Kept at 405 for compatibility with existing clients.
            AppError::NotAllowed => (StatusCode::METHOD_NOT_ALLOWED, None),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, None),
        };

        let message = if code.is_some() {
            "Failed".to_string()
        } else {
            self.to_string()
        };
        let errors = match self {
            AppError::Validation(errors) => Some(errors),
            _ => None,
        };

        (
            status,
            Json(ErrorBody {
                message,
                code,
                errors,
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
