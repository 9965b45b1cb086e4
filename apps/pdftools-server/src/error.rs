//! Error types for the PDF tools server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdftools_core::PdfToolsError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("File is too large. Maximum size is {limit_mb} MB.")]
    PayloadTooLarge { limit_mb: u64 },

    #[error("{operation} failed: {source}")]
    Transform {
        operation: &'static str,
        #[source]
        source: PdfToolsError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn transform(operation: &'static str) -> impl FnOnce(PdfToolsError) -> Self {
        move |source| ApiError::Transform { operation, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Transform { source, .. } if source.is_recoverable() => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Transform { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("Worker task failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Recoverable failures are shown to the user as-is
            ApiError::Transform { source, .. } if source.is_recoverable() => source.to_string(),
            ApiError::Transform { operation, source } => {
                tracing::error!(operation, error = %source, "Transformation failed");
                self.to_string()
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
