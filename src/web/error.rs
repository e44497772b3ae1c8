//! Standardized API error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use ts_rs::TS;

/// Machine-readable error code for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ApiErrorCode {
    NotFound,
    BadRequest,
    InternalError,
    Unauthorized,
    SlotUnavailable,
}

/// Standardized error response for all API endpoints. Every non-2xx body
/// carries at least `error`; `code` and `details` are filled in when known.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ApiErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: Some(code),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadRequest, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InternalError, message)
    }

    fn status_code(&self) -> StatusCode {
        match self.code {
            Some(ApiErrorCode::NotFound) => StatusCode::NOT_FOUND,
            Some(ApiErrorCode::BadRequest) => StatusCode::BAD_REQUEST,
            Some(ApiErrorCode::Unauthorized) => StatusCode::UNAUTHORIZED,
            Some(ApiErrorCode::SlotUnavailable) => StatusCode::CONFLICT,
            Some(ApiErrorCode::InternalError) | None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

/// Map a core domain error onto the wire error envelope. Internal errors are
/// logged in full and sanitized before leaving the process.
impl From<crate::error::Error> for ApiError {
    fn from(e: crate::error::Error) -> Self {
        use crate::error::Error as E;
        match e {
            E::Validation(message) => Self::new(ApiErrorCode::BadRequest, message),
            E::NotFound => Self::not_found("not found"),
            E::SlotUnavailable => {
                Self::new(ApiErrorCode::SlotUnavailable, "slot is no longer available")
            }
            E::Unauthorized => Self::new(ApiErrorCode::Unauthorized, "unauthorized"),
            E::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                Self::internal_error("internal error")
            }
        }
    }
}

/// Ambient glue errors (store I/O, external clients) surface the same way
/// as [`crate::error::Error::Internal`].
impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!(error = %e, "internal error");
        Self::internal_error("internal error")
    }
}
