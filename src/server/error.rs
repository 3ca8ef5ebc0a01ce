//! HTTP error mapping.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::error::{DetectError, StorageError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Multipart read failure; the status comes from axum (413 when the body cap is hit)
    #[error("Malformed multipart body: {1}")]
    Multipart(StatusCode, String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Detect(#[from] DetectError),
}

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn from_multipart(err: MultipartError) -> Self {
        Self::Multipart(err.status(), err.body_text())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Multipart(status, _) => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Detect(err) => match err {
                DetectError::MissingInput(_)
                | DetectError::UnknownDetectionType(_)
                | DetectError::InvalidFilename(_)
                | DetectError::Decode(_) => StatusCode::BAD_REQUEST,
                DetectError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
                DetectError::DetectorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                DetectError::Backend(_) | DetectError::OutOfBounds(..) | DetectError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(%status, "request failed: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
