//! # Document Endpoints
//!
//! Upload, listing, retrieval, sharing, and deletion of credential
//! documents, plus the blob upload that precedes metadata creation.
//!
//! Every read applies the read-time expiry rule before the record leaves
//! the handler; clients never see a stale `verified` on an expired
//! credential. Document `status` is never writable here — only the
//! dispatcher recomputes it.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use credence_core::{DocumentKind, FileReference, Privacy, Timestamp};
use credence_state::DocumentStatus;

use crate::auth::{can_read_document, can_write_document, CallerIdentity, Capability};
use crate::dispatch;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, DocumentRecord};

/// Maximum number of reader designations on a shared document.
const MAX_SHARED_WITH: usize = 100;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Response from the blob upload endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BlobUploadResponse {
    /// Handle to pass as `file_reference` when creating the document.
    pub file_reference: String,
    pub file_size: u64,
}

/// Request body for document creation (metadata only — bytes go through
/// the blob store first).
#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadDocumentRequest {
    pub display_name: String,
    #[schema(value_type = String)]
    pub kind: DocumentKind,
    pub issuer: String,
    pub institution_id: Option<Uuid>,
    pub file_reference: String,
    pub file_size: u64,
    pub content_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[schema(value_type = String)]
    pub privacy: Privacy,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Validate for UploadDocumentRequest {
    fn validate(&self) -> Result<(), String> {
        if self.display_name.trim().is_empty() {
            return Err("display_name must not be empty".into());
        }
        if self.display_name.len() > 255 {
            return Err("display_name must not exceed 255 characters".into());
        }
        if self.issuer.trim().is_empty() {
            return Err("issuer must not be empty".into());
        }
        if self.issuer.len() > 255 {
            return Err("issuer must not exceed 255 characters".into());
        }
        if self.content_type.trim().is_empty() {
            return Err("content_type must not be empty".into());
        }
        if self.file_size == 0 {
            return Err("file_size must be positive".into());
        }
        Ok(())
    }
}

/// Request body for privacy/sharing updates.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSharingRequest {
    #[schema(value_type = Option<String>)]
    pub privacy: Option<Privacy>,
    pub shared_with: Option<Vec<Uuid>>,
}

impl Validate for UpdateSharingRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(designees) = &self.shared_with {
            if designees.len() > MAX_SHARED_WITH {
                return Err(format!("shared_with must not exceed {MAX_SHARED_WITH} entries"));
            }
        }
        Ok(())
    }
}

/// Query filters for document listing.
#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    /// Filter on effective status.
    pub status: Option<DocumentStatus>,
    pub kind: Option<DocumentKind>,
}

/// Document listing response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentListResponse {
    pub count: usize,
    pub documents: Vec<DocumentRecord>,
}

/// Query flags for deletion.
#[derive(Debug, Deserialize)]
pub struct DeleteDocumentQuery {
    /// Also remove completed verification requests (operator only).
    #[serde(default)]
    pub purge: bool,
}

/// The record as a reader should see it: expiry applied at read time.
fn view(mut doc: DocumentRecord, now: Timestamp) -> DocumentRecord {
    doc.status = doc.effective_status(now);
    doc
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the documents router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/blobs", post(upload_blob))
        .route("/v1/documents", post(create_document).get(list_documents))
        .route(
            "/v1/documents/:id",
            get(get_document)
                .patch(update_document_sharing)
                .delete(delete_document),
        )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/blobs — store document bytes, returning the reference.
///
/// The engine itself never touches the bytes again; the reference is
/// what flows through records and analyzer calls.
#[utoipa::path(
    post,
    path = "/v1/blobs",
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Blob stored", body = BlobUploadResponse),
        (status = 422, description = "Empty body", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub(crate) async fn upload_blob(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    body: Bytes,
) -> Result<(StatusCode, Json<BlobUploadResponse>), AppError> {
    if body.is_empty() {
        return Err(AppError::Validation("blob body must not be empty".into()));
    }
    let file_size = body.len() as u64;
    let reference = state.blobs.put(body.to_vec());
    Ok((
        StatusCode::CREATED,
        Json(BlobUploadResponse {
            file_reference: reference.as_str().to_string(),
            file_size,
        }),
    ))
}

/// POST /v1/documents — create a document record.
#[utoipa::path(
    post,
    path = "/v1/documents",
    request_body = UploadDocumentRequest,
    responses(
        (status = 201, description = "Document created", body = DocumentRecord),
        (status = 422, description = "Validation failure", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub(crate) async fn create_document(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<UploadDocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DocumentRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let file_reference = FileReference::new(req.file_reference)?;

    let now = Utc::now();
    let metadata = match req.metadata {
        serde_json::Value::Null => serde_json::json!({}),
        other => other,
    };
    let record = DocumentRecord {
        id: Uuid::new_v4(),
        user_id: caller.user_id,
        display_name: req.display_name.trim().to_string(),
        kind: req.kind,
        issuer: req.issuer.trim().to_string(),
        institution_id: req.institution_id,
        file_reference,
        file_size: req.file_size,
        content_type: req.content_type,
        uploaded_at: now,
        expires_at: req.expires_at,
        status: DocumentStatus::Uploaded,
        privacy: req.privacy,
        shared_with: Vec::new(),
        metadata,
        active_request_id: None,
        created_at: now,
        updated_at: now,
    };
    state.documents.insert(record.id, record.clone());

    Ok((StatusCode::CREATED, Json(view(record, Timestamp::now()))))
}

/// GET /v1/documents — list documents visible to the caller.
///
/// Operators see the whole fleet; everyone else sees their own
/// documents plus `shared` documents they were designated for. Public
/// discovery goes through the portfolio view instead.
#[utoipa::path(
    get,
    path = "/v1/documents",
    params(
        ("status" = Option<String>, Query, description = "Filter on effective status"),
        ("kind" = Option<String>, Query, description = "Filter on document kind"),
    ),
    responses(
        (status = 200, description = "Documents visible to the caller", body = DocumentListResponse),
    ),
    tag = "documents"
)]
pub(crate) async fn list_documents(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let caps = caller.capabilities(&state);
    let now = Timestamp::now();

    let mut documents: Vec<DocumentRecord> = state
        .documents
        .list()
        .into_iter()
        .filter(|doc| {
            if caps.has(Capability::ReadAll) {
                return true;
            }
            doc.user_id == caller.user_id
                || (doc.privacy == Privacy::Shared && doc.shared_with.contains(&caller.user_id))
        })
        .map(|doc| view(doc, now))
        .filter(|doc| query.status.map_or(true, |s| doc.status == s))
        .filter(|doc| query.kind.map_or(true, |k| doc.kind == k))
        .collect();
    documents.sort_by_key(|d| std::cmp::Reverse(d.uploaded_at));

    Ok(Json(DocumentListResponse {
        count: documents.len(),
        documents,
    }))
}

/// GET /v1/documents/:id — fetch one document.
#[utoipa::path(
    get,
    path = "/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "The document", body = DocumentRecord),
        (status = 403, description = "Not visible to the caller", body = crate::error::ErrorBody),
        (status = 404, description = "No such document", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub(crate) async fn get_document(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentRecord>, AppError> {
    let doc = state
        .documents
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("document {id} not found")))?;

    let caps = caller.capabilities(&state);
    if !can_read_document(&caller, caps, &doc) {
        return Err(AppError::Forbidden("document is not visible to you".into()));
    }
    Ok(Json(view(doc, Timestamp::now())))
}

/// PATCH /v1/documents/:id — update privacy and reader designations.
#[utoipa::path(
    patch,
    path = "/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body = UpdateSharingRequest,
    responses(
        (status = 200, description = "Updated document", body = DocumentRecord),
        (status = 403, description = "Caller does not own the document", body = crate::error::ErrorBody),
        (status = 404, description = "No such document", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub(crate) async fn update_document_sharing(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateSharingRequest>, JsonRejection>,
) -> Result<Json<DocumentRecord>, AppError> {
    let req = extract_validated_json(body)?;

    let doc = state
        .documents
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("document {id} not found")))?;
    let caps = caller.capabilities(&state);
    if !can_write_document(&caller, caps, &doc) {
        return Err(AppError::Forbidden("only the document owner may change sharing".into()));
    }

    let updated = state
        .documents
        .update(&id, |doc| {
            if let Some(privacy) = req.privacy {
                doc.privacy = privacy;
            }
            if let Some(designees) = req.shared_with.clone() {
                doc.shared_with = designees;
            }
            doc.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("document {id} not found")))?;

    Ok(Json(view(updated, Timestamp::now())))
}

/// DELETE /v1/documents/:id — delete a document.
///
/// Cascades to non-completed verification requests; completed requests
/// are retained for audit unless `purge=true` (operator only).
#[utoipa::path(
    delete,
    path = "/v1/documents/{id}",
    params(
        ("id" = Uuid, Path, description = "Document ID"),
        ("purge" = Option<bool>, Query, description = "Also remove completed requests"),
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Caller does not own the document", body = crate::error::ErrorBody),
        (status = 404, description = "No such document", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub(crate) async fn delete_document(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteDocumentQuery>,
) -> Result<StatusCode, AppError> {
    dispatch::delete_document(&state, &caller, id, query.purge)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::auth::Role;

    fn caller(role: Role) -> CallerIdentity {
        CallerIdentity {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    fn app_as(state: AppState, identity: CallerIdentity) -> Router<()> {
        Router::new()
            .merge(router())
            .layer(axum::Extension(identity))
            .with_state(state)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn upload_body(name: &str) -> String {
        serde_json::json!({
            "display_name": name,
            "kind": "degree",
            "issuer": "Example University",
            "file_reference": "blobs/degree.pdf",
            "file_size": 2048,
            "content_type": "application/pdf",
        })
        .to_string()
    }

    async fn create(app: &Router<()>, name: &str) -> DocumentRecord {
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/documents")
                    .header("content-type", "application/json")
                    .body(Body::from(upload_body(name)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let state = AppState::new();
        let owner = caller(Role::JobSeeker);
        let app = app_as(state, owner);

        let doc = create(&app, "BSc Computer Science").await;
        assert_eq!(doc.user_id, owner.user_id);
        assert_eq!(doc.status, DocumentStatus::Uploaded);
        assert_eq!(doc.privacy, Privacy::Private);
        assert!(doc.active_request_id.is_none());

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/documents/{}", doc.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let fetched: DocumentRecord = body_json(resp).await;
        assert_eq!(fetched.id, doc.id);
    }

    #[tokio::test]
    async fn upload_validation_rejects_empty_name() {
        let state = AppState::new();
        let app = app_as(state, caller(Role::JobSeeker));

        let body = serde_json::json!({
            "display_name": "   ",
            "kind": "degree",
            "issuer": "Example University",
            "file_reference": "blobs/x.pdf",
            "file_size": 10,
            "content_type": "application/pdf",
        });
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/documents")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn stranger_cannot_read_private_document() {
        let state = AppState::new();
        let owner = caller(Role::JobSeeker);
        let doc = create(&app_as(state.clone(), owner), "Private degree").await;

        let stranger_app = app_as(state, caller(Role::Employer));
        let resp = stranger_app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/documents/{}", doc.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn sharing_designation_grants_read() {
        let state = AppState::new();
        let owner = caller(Role::JobSeeker);
        let reader = caller(Role::Employer);
        let owner_app = app_as(state.clone(), owner);

        let doc = create(&owner_app, "Shared transcript").await;

        let patch_body = serde_json::json!({
            "privacy": "shared",
            "shared_with": [reader.user_id],
        });
        let resp = owner_app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/v1/documents/{}", doc.id))
                    .header("content-type", "application/json")
                    .body(Body::from(patch_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let reader_app = app_as(state, reader);
        let resp = reader_app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/documents/{}", doc.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn listing_shows_own_and_designated_only() {
        let state = AppState::new();
        let owner = caller(Role::JobSeeker);
        let other = caller(Role::JobSeeker);

        create(&app_as(state.clone(), owner), "Mine").await;
        create(&app_as(state.clone(), other), "Theirs").await;

        let resp = app_as(state, owner)
            .oneshot(Request::builder().uri("/v1/documents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let list: DocumentListResponse = body_json(resp).await;
        assert_eq!(list.count, 1);
        assert_eq!(list.documents[0].display_name, "Mine");
    }

    #[tokio::test]
    async fn admin_lists_the_fleet() {
        let state = AppState::new();
        create(&app_as(state.clone(), caller(Role::JobSeeker)), "A").await;
        create(&app_as(state.clone(), caller(Role::JobSeeker)), "B").await;

        let admin = caller(Role::University);
        state.admins.grant(admin.user_id);

        let resp = app_as(state, admin)
            .oneshot(Request::builder().uri("/v1/documents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let list: DocumentListResponse = body_json(resp).await;
        assert_eq!(list.count, 2);
    }

    #[tokio::test]
    async fn status_filter_applies_to_effective_status() {
        let state = AppState::new();
        let owner = caller(Role::JobSeeker);
        let app = app_as(state.clone(), owner);

        create(&app, "Fresh").await;

        // A document that expired yesterday reads as expired.
        let expired_body = serde_json::json!({
            "display_name": "Old license",
            "kind": "license",
            "issuer": "Licensing Board",
            "file_reference": "blobs/old.pdf",
            "file_size": 100,
            "content_type": "application/pdf",
            "expires_at": Utc::now() - chrono::Duration::days(1),
        });
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/documents")
                    .header("content-type", "application/json")
                    .body(Body::from(expired_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let expired_doc: DocumentRecord = body_json(resp).await;
        assert_eq!(expired_doc.status, DocumentStatus::Expired);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/v1/documents?status=expired")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let list: DocumentListResponse = body_json(resp).await;
        assert_eq!(list.count, 1);
        assert_eq!(list.documents[0].display_name, "Old license");
    }

    #[tokio::test]
    async fn delete_returns_204_and_removes() {
        let state = AppState::new();
        let owner = caller(Role::JobSeeker);
        let app = app_as(state.clone(), owner);

        let doc = create(&app, "Disposable").await;

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/v1/documents/{}", doc.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(state.documents.get(&doc.id).is_none());
    }

    #[tokio::test]
    async fn blob_upload_returns_resolvable_reference() {
        let state = AppState::new();
        let app = app_as(state.clone(), caller(Role::JobSeeker));

        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/blobs")
                    .header("content-type", "application/octet-stream")
                    .body(Body::from(&b"pdf bytes"[..]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let uploaded: BlobUploadResponse = body_json(resp).await;
        assert_eq!(uploaded.file_size, 9);

        let reference = FileReference::new(uploaded.file_reference).unwrap();
        assert!(state.blobs.exists(&reference));
    }
}
