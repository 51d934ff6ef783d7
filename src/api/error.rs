use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use biodetect_core::detect::DetectionKind;
use serde::Serialize;
use thiserror::Error;

use crate::queue::QueueError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// 400, raised before the upload is read
    #[error("Invalid endpoint. Must be one of {}", valid_kinds())]
    InvalidKind,

    /// 422
    #[error("Field required: {0}")]
    MissingField(&'static str),

    /// 413
    #[error("Upload exceeds the size limit")]
    PayloadTooLarge,

    /// 500, the upload could not be read or decoded
    #[error("Error processing request: {0}")]
    Processing(String),

    /// 500
    #[error("Detection error: {0:#}")]
    Detection(anyhow::Error),

    /// 503
    #[error("Detection service unavailable")]
    Unavailable,
}

fn valid_kinds() -> String {
    let quoted: Vec<_> = DetectionKind::ALL
        .iter()
        .map(|k| format!("'{}'", k.as_str()))
        .collect();
    format!("[{}]", quoted.join(", "))
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidKind => StatusCode::BAD_REQUEST,
            Self::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Processing(_) | Self::Detection(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::WorkerGone => ApiError::Unavailable,
            QueueError::Detection(e) => ApiError::Detection(e),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::Processing(e.body_text())
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %detail, "API error");
        } else {
            tracing::warn!(error = %detail, "API error");
        }

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_invalid_kind_detail() {
        assert_eq!(
            ApiError::InvalidKind.to_string(),
            "Invalid endpoint. Must be one of ['arm', 'arm-fingers', 'eyes', 'head', 'people']"
        );
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::MissingField("file").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(QueueError::WorkerGone).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let err = ApiError::from(QueueError::Detection(anyhow!("model failed")));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Detection error: model failed");
    }
}
