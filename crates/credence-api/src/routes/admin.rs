//! # Operator Console
//!
//! Read-only fleet monitoring plus the few mutations reserved for
//! operators: granting/revoking the admin flag and assigning
//! subscriptions. Every handler resolves the caller's admin flag per
//! call — there is no cached elevation to go stale.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use credence_core::{Timestamp, UserId};
use credence_entitlement::{PlanTier, Subscription};
use credence_state::VerificationRequest;

use crate::auth::{CallerIdentity, Capability};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::reporter::{compute_stats, FleetStats};
use crate::state::AppState;

/// Length of an operator-assigned billing cycle, in days.
const ASSIGNED_CYCLE_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// The manual-review worklist: active requests, highest priority first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewQueueResponse {
    pub count: usize,
    #[schema(value_type = Vec<Object>)]
    pub requests: Vec<VerificationRequest>,
}

/// Request body for granting or revoking the admin flag.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetAdminRequest {
    pub granted: bool,
}

/// Request body for operator subscription assignment.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignSubscriptionRequest {
    #[schema(value_type = String)]
    pub tier: PlanTier,
}

/// Response from subscription assignment.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignSubscriptionResponse {
    #[schema(value_type = Object)]
    pub subscription: Subscription,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/stats", get(get_stats))
        .route("/v1/admin/verifications/queue", get(review_queue))
        .route("/v1/admin/users/:id/admin", post(set_admin_flag))
        .route("/v1/admin/users/:id/subscription", put(assign_subscription))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /v1/admin/stats — fleet-wide verification summary.
#[utoipa::path(
    get,
    path = "/v1/admin/stats",
    responses(
        (status = 200, description = "Fleet statistics", body = FleetStats),
        (status = 403, description = "Caller is not an operator", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub(crate) async fn get_stats(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<FleetStats>, AppError> {
    caller.capabilities(&state).require(Capability::ReadStats)?;
    Ok(Json(compute_stats(&state, Timestamp::now())))
}

/// GET /v1/admin/verifications/queue — the active-request worklist.
///
/// Ordered by priority (highest first), then by admission time, so
/// manual reviewers always pull the most urgent item.
#[utoipa::path(
    get,
    path = "/v1/admin/verifications/queue",
    responses(
        (status = 200, description = "Active requests in service order", body = ReviewQueueResponse),
        (status = 403, description = "Caller is not an operator", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub(crate) async fn review_queue(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<ReviewQueueResponse>, AppError> {
    caller.capabilities(&state).require(Capability::ReadAll)?;

    let mut requests: Vec<VerificationRequest> = state
        .requests
        .list()
        .into_iter()
        .filter(|r| r.status.is_active())
        .collect();
    requests.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.requested_at.cmp(&b.requested_at))
    });

    Ok(Json(ReviewQueueResponse {
        count: requests.len(),
        requests,
    }))
}

/// POST /v1/admin/users/:id/admin — grant or revoke the admin flag.
#[utoipa::path(
    post,
    path = "/v1/admin/users/{id}/admin",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = SetAdminRequest,
    responses(
        (status = 204, description = "Flag updated"),
        (status = 403, description = "Caller is not an operator", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub(crate) async fn set_admin_flag(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(user_id): Path<Uuid>,
    body: Result<Json<SetAdminRequest>, JsonRejection>,
) -> Result<axum::http::StatusCode, AppError> {
    caller.capabilities(&state).require(Capability::WriteAll)?;
    let req = extract_json(body)?;

    if req.granted {
        state.admins.grant(user_id);
    } else {
        state.admins.revoke(user_id);
    }
    tracing::info!(
        operator = %caller.user_id,
        subject = %user_id,
        granted = req.granted,
        "admin flag changed"
    );
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// PUT /v1/admin/users/:id/subscription — assign a plan tier.
///
/// Starts a fresh billing cycle at the new tier. Payment capture is an
/// external concern; this endpoint records the entitlement.
#[utoipa::path(
    put,
    path = "/v1/admin/users/{id}/subscription",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = AssignSubscriptionRequest,
    responses(
        (status = 200, description = "Subscription assigned", body = AssignSubscriptionResponse),
        (status = 403, description = "Caller is not an operator", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub(crate) async fn assign_subscription(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(user_id): Path<Uuid>,
    body: Result<Json<AssignSubscriptionRequest>, JsonRejection>,
) -> Result<Json<AssignSubscriptionResponse>, AppError> {
    caller.capabilities(&state).require(Capability::WriteAll)?;
    let req = extract_json(body)?;

    let now = Timestamp::now();
    let subscription = Subscription::new(
        UserId::from_uuid(user_id),
        req.tier,
        now,
        now.plus_days(ASSIGNED_CYCLE_DAYS),
    );
    state.subscriptions.insert(user_id, subscription.clone());

    Ok(Json(AssignSubscriptionResponse { subscription }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
