//! # Verification Endpoints
//!
//! Submission, inspection, and cancellation of verification requests.
//! Handlers stay thin: the lifecycle semantics (entitlement, in-flight
//! claim, analyzer invocation, status settlement) live in
//! [`crate::dispatch`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use credence_state::{RequestKind, VerificationRequest};

use crate::auth::{can_read_document, CallerIdentity, Capability};
use crate::dispatch;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request body for verification submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitVerificationRequest {
    /// How to verify. Defaults to automated analysis.
    #[serde(default = "default_kind")]
    #[schema(value_type = String)]
    pub kind: RequestKind,
    /// Higher values are served first in queued views.
    #[serde(default)]
    pub priority: i32,
}

fn default_kind() -> RequestKind {
    RequestKind::AiAnalysis
}

impl Validate for SubmitVerificationRequest {
    fn validate(&self) -> Result<(), String> {
        if !(-100..=100).contains(&self.priority) {
            return Err("priority must be within -100..=100".into());
        }
        Ok(())
    }
}

/// Listing of a document's verification requests, oldest first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerificationListResponse {
    pub count: usize,
    #[schema(value_type = Vec<Object>)]
    pub requests: Vec<VerificationRequest>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the verifications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/documents/:id/verifications",
            post(submit_verification).get(list_document_verifications),
        )
        .route("/v1/verifications/:id", get(get_verification))
        .route("/v1/verifications/:id/cancel", post(cancel_verification))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/documents/:id/verifications — submit a document for
/// verification.
///
/// Returns 202: the request record is durably created even when
/// resolution is still running in the background. Duplicate submits
/// while one request is outstanding return 409.
#[utoipa::path(
    post,
    path = "/v1/documents/{id}/verifications",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body = SubmitVerificationRequest,
    responses(
        (status = 202, description = "Verification accepted", body = serde_json::Value),
        (status = 403, description = "Caller does not own the document", body = crate::error::ErrorBody),
        (status = 404, description = "No such document", body = crate::error::ErrorBody),
        (status = 409, description = "A verification is already in flight", body = crate::error::ErrorBody),
        (status = 429, description = "Verification quota exhausted", body = crate::error::ErrorBody),
    ),
    tag = "verifications"
)]
pub(crate) async fn submit_verification(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(document_id): Path<Uuid>,
    body: Result<Json<SubmitVerificationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VerificationRequest>), AppError> {
    let req = extract_validated_json(body)?;
    let request =
        dispatch::submit_verification(&state, &caller, document_id, req.kind, req.priority).await?;
    Ok((StatusCode::ACCEPTED, Json(request)))
}

/// GET /v1/documents/:id/verifications — list a document's requests.
#[utoipa::path(
    get,
    path = "/v1/documents/{id}/verifications",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Requests for the document", body = VerificationListResponse),
        (status = 403, description = "Document not visible to the caller", body = crate::error::ErrorBody),
        (status = 404, description = "No such document", body = crate::error::ErrorBody),
    ),
    tag = "verifications"
)]
pub(crate) async fn list_document_verifications(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(document_id): Path<Uuid>,
) -> Result<Json<VerificationListResponse>, AppError> {
    let doc = state
        .documents
        .get(&document_id)
        .ok_or_else(|| AppError::NotFound(format!("document {document_id} not found")))?;
    let caps = caller.capabilities(&state);
    if !can_read_document(&caller, caps, &doc) {
        return Err(AppError::Forbidden("document is not visible to you".into()));
    }

    let requests = dispatch::requests_for_document(&state, document_id);
    Ok(Json(VerificationListResponse {
        count: requests.len(),
        requests,
    }))
}

/// GET /v1/verifications/:id — fetch one verification request.
///
/// Visible to operators, the requester, and anyone who can read the
/// parent document. Completed requests survive document deletion for
/// audit; those are visible to the requester and operators only.
#[utoipa::path(
    get,
    path = "/v1/verifications/{id}",
    params(("id" = Uuid, Path, description = "Verification request ID")),
    responses(
        (status = 200, description = "The request", body = serde_json::Value),
        (status = 403, description = "Not visible to the caller", body = crate::error::ErrorBody),
        (status = 404, description = "No such request", body = crate::error::ErrorBody),
    ),
    tag = "verifications"
)]
pub(crate) async fn get_verification(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<VerificationRequest>, AppError> {
    let request = state
        .requests
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("verification request {id} not found")))?;

    let caps = caller.capabilities(&state);
    let is_requester = *request.requested_by.as_uuid() == caller.user_id;
    let via_document = state
        .documents
        .get(request.document_id.as_uuid())
        .is_some_and(|doc| can_read_document(&caller, caps, &doc));

    if !(caps.has(Capability::ReadAll) || is_requester || via_document) {
        return Err(AppError::Forbidden("verification request is not visible to you".into()));
    }
    Ok(Json(request))
}

/// POST /v1/verifications/:id/cancel — cancel a verification request.
///
/// Idempotent: a request already in a terminal state is returned
/// unchanged with 200.
#[utoipa::path(
    post,
    path = "/v1/verifications/{id}/cancel",
    params(("id" = Uuid, Path, description = "Verification request ID")),
    responses(
        (status = 200, description = "The request after cancellation", body = serde_json::Value),
        (status = 403, description = "Caller may not cancel this request", body = crate::error::ErrorBody),
        (status = 404, description = "No such request", body = crate::error::ErrorBody),
    ),
    tag = "verifications"
)]
pub(crate) async fn cancel_verification(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<VerificationRequest>, AppError> {
    let request = dispatch::cancel_verification(&state, &caller, id)?;
    Ok(Json(request))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
