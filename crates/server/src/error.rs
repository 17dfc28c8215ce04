use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{permissions::PermissionError, relationship_sync::RelationshipSyncError};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    RelationshipSync(#[from] RelationshipSyncError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Permission(PermissionError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            ApiError::Permission(PermissionError::Forbidden { .. }) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::RelationshipSync(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}
