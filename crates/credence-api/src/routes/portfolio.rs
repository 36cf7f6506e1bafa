//! # Public Portfolio View
//!
//! Read-only, unauthenticated view of a user's `public` documents.
//! Mounted outside the auth middleware: anyone with the link can see
//! what the owner chose to publish, and nothing else. Responses never
//! reveal whether the user has additional private or shared documents.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use credence_core::{Privacy, Timestamp};

use crate::state::{AppState, DocumentRecord};

/// A user's public portfolio.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PortfolioResponse {
    pub user_id: Uuid,
    /// Display name from the user mirror, when known.
    pub display_name: Option<String>,
    pub count: usize,
    /// Public documents only, newest first, expiry applied.
    pub documents: Vec<DocumentRecord>,
}

/// Build the portfolio router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/portfolio/:user_id", get(get_portfolio))
}

/// GET /v1/portfolio/:user_id — list a user's public documents.
///
/// An unknown user yields an empty portfolio rather than 404, so the
/// endpoint cannot be used to probe which user ids exist.
#[utoipa::path(
    get,
    path = "/v1/portfolio/{user_id}",
    params(("user_id" = Uuid, Path, description = "Portfolio owner")),
    responses(
        (status = 200, description = "Public documents of the user", body = PortfolioResponse),
    ),
    tag = "portfolio"
)]
pub(crate) async fn get_portfolio(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<PortfolioResponse> {
    let now = Timestamp::now();
    let mut documents: Vec<DocumentRecord> = state
        .documents
        .list()
        .into_iter()
        .filter(|doc| doc.user_id == user_id && doc.privacy == Privacy::Public)
        .map(|mut doc| {
            doc.status = doc.effective_status(now);
            doc
        })
        .collect();
    documents.sort_by_key(|d| std::cmp::Reverse(d.uploaded_at));

    let display_name = state
        .users
        .get(&user_id)
        .map(|u| u.display_name)
        .filter(|name| !name.is_empty());

    Json(PortfolioResponse {
        user_id,
        display_name,
        count: documents.len(),
        documents,
    })
}
