use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("database: {0}")]
    Storage(#[from] sea_orm::DbErr),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND.into_response(),
            AppError::MalformedRequest(reason) => {
                tracing::debug!(%reason, "rejected request");
                StatusCode::BAD_REQUEST.into_response()
            },
            AppError::Storage(err) => {
                tracing::error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            },
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
