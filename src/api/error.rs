use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::errors::Error;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    PreconditionFailed(String),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request<S: Into<String>>(msg: S) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let (error_kind, message) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg),
            ApiError::NotFound(msg) => ("not_found", msg),
            ApiError::Unauthorized(msg) => ("unauthorized", msg),
            ApiError::PreconditionFailed(msg) => ("precondition_failed", msg),
            ApiError::BadGateway(msg) => ("bad_gateway", msg),
            ApiError::Internal(msg) => ("internal_error", msg),
        };

        (status, Json(ErrorBody { error: error_kind, message })).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::Validation { .. } => ApiError::BadRequest(message),
            Error::ConfigurationMissing => ApiError::PreconditionFailed(message),
            Error::RoleNotFound { .. } => ApiError::NotFound(message),
            Error::Authentication { .. } => ApiError::Unauthorized(message),
            Error::Provider { .. } | Error::IdentityResolution { .. } => ApiError::BadGateway(message),
            Error::Storage { .. }
            | Error::Serialization { .. }
            | Error::Config(_)
            | Error::Transport(_)
            | Error::Io(_) => {
                tracing::error!(kind = err.kind(), error = %message, "Request failed");
                ApiError::Internal(message)
            }
        }
    }
}
