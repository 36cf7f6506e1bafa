//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Credence API",
        version = "0.3.2",
        description = "Document verification lifecycle engine: credential upload, analyzer-backed verification, entitlement gating, and the operator console.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Documents
        crate::routes::documents::upload_blob,
        crate::routes::documents::create_document,
        crate::routes::documents::list_documents,
        crate::routes::documents::get_document,
        crate::routes::documents::update_document_sharing,
        crate::routes::documents::delete_document,
        // Verifications
        crate::routes::verifications::submit_verification,
        crate::routes::verifications::list_document_verifications,
        crate::routes::verifications::get_verification,
        crate::routes::verifications::cancel_verification,
        // Portfolio
        crate::routes::portfolio::get_portfolio,
        // Admin
        crate::routes::admin::get_stats,
        crate::routes::admin::review_queue,
        crate::routes::admin::set_admin_flag,
        crate::routes::admin::assign_subscription,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::state::DocumentRecord,
        crate::state::UserRecord,
        crate::auth::Role,
        crate::reporter::FleetStats,
        crate::routes::documents::BlobUploadResponse,
        crate::routes::documents::UploadDocumentRequest,
        crate::routes::documents::UpdateSharingRequest,
        crate::routes::documents::DocumentListResponse,
        crate::routes::verifications::SubmitVerificationRequest,
        crate::routes::verifications::VerificationListResponse,
        crate::routes::portfolio::PortfolioResponse,
        crate::routes::admin::ReviewQueueResponse,
        crate::routes::admin::SetAdminRequest,
        crate::routes::admin::AssignSubscriptionRequest,
        crate::routes::admin::AssignSubscriptionResponse,
    )),
    tags(
        (name = "documents", description = "Credential document management"),
        (name = "verifications", description = "Verification request lifecycle"),
        (name = "portfolio", description = "Public portfolio view"),
        (name = "admin", description = "Operator console"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_spec))
}

/// GET /openapi.json — the assembled spec.
async fn serve_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_assembles() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("/v1/documents"));
        assert!(json.contains("/v1/admin/stats"));
        assert!(json.contains("/v1/portfolio/{user_id}"));
    }
}
