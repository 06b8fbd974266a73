//! HTTP error mapping

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use modelgate_core::{Error, FieldError};
use modelgate_models::UnknownDomain;
use serde_json::{json, Value};
use tracing::{error, warn};

/// Errors returned by handlers, rendered as `{"detail": ...}`
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Model(#[from] Error),

    #[error(transparent)]
    UnknownDomain(#[from] UnknownDomain),

    /// Body could not be parsed into the request type
    #[error("{0}")]
    InvalidBody(String),

    /// Malformed multipart upload
    #[error("{0}")]
    BadRequest(String),

    /// Body larger than `server.body_limit_bytes`
    #[error("{0}")]
    PayloadTooLarge(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Model(e) => match e {
                Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                Error::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Error::Decode(_) => StatusCode::BAD_REQUEST,
                Error::ArtifactNotFound(_) | Error::ArtifactCorrupt { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::UnknownDomain(_) => StatusCode::NOT_FOUND,
            AppError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Model(e) => e.kind(),
            AppError::UnknownDomain(_) => "unknown_domain",
            AppError::InvalidBody(_) => "invalid_body",
            AppError::BadRequest(_) => "bad_request",
            AppError::PayloadTooLarge(_) => "payload_too_large",
        }
    }

    fn detail(&self) -> Value {
        match self {
            AppError::Model(Error::Validation(fields)) => {
                Value::Array(fields.iter().map(field_detail).collect())
            }
            AppError::Model(Error::UnsupportedMedia(_)) => json!("Unsupported image type"),
            AppError::Model(Error::Decode(_)) => json!("Invalid image"),
            AppError::InvalidBody(msg) => json!([{ "loc": ["body"], "msg": msg, "type": "invalid_body" }]),
            other => json!(other.to_string()),
        }
    }
}

fn field_detail(field: &FieldError) -> Value {
    json!({
        "loc": ["body", field.field],
        "msg": field.message,
        "type": field.kind,
    })
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge(rejection.body_text());
        }
        AppError::InvalidBody(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::InvalidBody(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge(err.body_text());
        }
        AppError::BadRequest(format!("Invalid multipart body: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            warn!(kind = self.kind(), error = %self, "Request rejected");
        }

        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
