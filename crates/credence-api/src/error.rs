//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from credence-state, credence-entitlement, and
//! credence-core to HTTP status codes with stable machine-readable codes.
//! Internal error details are never exposed in responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses use this format across the API surface.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "QUOTA_EXCEEDED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Referenced document, request, or user is absent (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input, rejected before any state change (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failure — missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The principal lacks the required capability or ownership (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Entitlement gate denial — the billing cycle's quota is spent (429).
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The document already has a non-terminal verification request (409).
    #[error("verification already in flight: {0}")]
    RequestInFlight(String),

    /// State machine contract violation (409).
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Internal server error (500). Message is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::QuotaExceeded(_) => (StatusCode::TOO_MANY_REQUESTS, "QUOTA_EXCEEDED"),
            Self::RequestInFlight(_) => (StatusCode::CONFLICT, "REQUEST_ALREADY_IN_FLIGHT"),
            Self::InvalidTransition(_) => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Core validation errors surface as 422.
impl From<credence_core::ValidationError> for AppError {
    fn from(err: credence_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// State machine rejections surface as 409 conflicts.
impl From<credence_state::RequestError> for AppError {
    fn from(err: credence_state::RequestError) -> Self {
        Self::InvalidTransition(err.to_string())
    }
}

/// Entitlement denials surface as 429.
impl From<credence_entitlement::EntitlementError> for AppError {
    fn from(err: credence_entitlement::EntitlementError) -> Self {
        Self::QuotaExceeded(err.to_string())
    }
}
