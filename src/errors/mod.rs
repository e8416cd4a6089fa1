use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("webhook not found")]
    NotFound,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(err) => {
                tracing::error!(error = ?err, "database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_owned(),
                )
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "Webhook not found".to_owned()),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
