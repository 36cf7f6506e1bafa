//! # Authentication & Access Control
//!
//! Bearer token middleware resolving an explicit [`CallerIdentity`] for
//! every request, plus the capability model that gates all document and
//! admin operations.
//!
//! ## Token Format
//!
//! The identity provider issues bearer tokens encoding role and user:
//!
//! ```text
//! Bearer {role}:{user_id}:{secret}
//! ```
//!
//! The secret is compared in constant time. When no secret is configured
//! (development mode) the identity portion is still required — ownership
//! checks are meaningless without one.
//!
//! ## Capabilities
//!
//! Operations never branch on role names. The caller's (role, admin flag)
//! pair resolves to a capability set once per request, and each handler
//! checks the specific capability it needs. The admin flag is looked up
//! per call from the [`AdminRegistry`](crate::state::AdminRegistry) —
//! it is never carried on the identity, so revocation is immediate.

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::state::{AppState, DocumentRecord};

use credence_core::Privacy;

// ── Role ────────────────────────────────────────────────────────────────────

/// Primary roles on the platform.
///
/// Roles are peers; none outranks another. Elevated access comes from
/// the separately granted admin flag, not from the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Uploads and manages their own credential documents.
    JobSeeker,
    /// Views documents candidates share with them.
    Employer,
    /// Issues credentials and confirms institution records.
    University,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JobSeeker => "job_seeker",
            Self::Employer => "employer",
            Self::University => "university",
        }
    }

    /// Parse a role from its token segment.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "job_seeker" => Some(Self::JobSeeker),
            "employer" => Some(Self::Employer),
            "university" => Some(Self::University),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Capabilities ────────────────────────────────────────────────────────────

/// Fine-grained permissions checked by every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Read documents the caller owns.
    ReadOwn,
    /// Read `shared` documents the owner designated the caller for.
    ReadShared,
    /// Read any document or verification request.
    ReadAll,
    /// Create, modify, and delete documents the caller owns; submit and
    /// cancel verifications on them.
    WriteOwn,
    /// Write any document or verification request.
    WriteAll,
    /// Read fleet-wide aggregate statistics.
    ReadStats,
}

/// Capabilities held by every authenticated principal.
const BASE_CAPABILITIES: &[Capability] = &[
    Capability::ReadOwn,
    Capability::ReadShared,
    Capability::WriteOwn,
];

/// Capabilities held by principals with the admin flag.
const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::ReadOwn,
    Capability::ReadShared,
    Capability::ReadAll,
    Capability::WriteOwn,
    Capability::WriteAll,
    Capability::ReadStats,
];

/// The caller's resolved capability set.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities(&'static [Capability]);

impl Capabilities {
    /// Whether the set contains `cap`.
    pub fn has(&self, cap: Capability) -> bool {
        self.0.contains(&cap)
    }

    /// Fail with 403 unless the set contains `cap`.
    pub fn require(&self, cap: Capability) -> Result<(), AppError> {
        if self.has(cap) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("requires {cap:?} capability")))
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
///
/// Passed explicitly into every core operation — nothing reads an
/// ambient "current user". Deliberately does NOT carry the admin flag;
/// see [`CallerIdentity::capabilities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Stable user identifier from the identity provider.
    pub user_id: Uuid,
    /// The caller's primary role.
    pub role: Role,
}

impl CallerIdentity {
    /// Resolve the caller's capability set, looking up the admin flag
    /// per call.
    pub fn capabilities(&self, state: &AppState) -> Capabilities {
        if state.is_admin(self.user_id) {
            Capabilities(ADMIN_CAPABILITIES)
        } else {
            Capabilities(BASE_CAPABILITIES)
        }
    }
}

/// Extracts the identity the auth middleware injected into extensions.
/// Returns 401 if none is present (middleware didn't run or failed).
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Document visibility ─────────────────────────────────────────────────────

/// Whether the caller may read `doc`.
///
/// Owners read their own documents; `shared` documents extend to the
/// owner-designated readers; `public` documents are readable by anyone.
pub fn can_read_document(caller: &CallerIdentity, caps: Capabilities, doc: &DocumentRecord) -> bool {
    if caps.has(Capability::ReadAll) {
        return true;
    }
    if doc.user_id == caller.user_id {
        return caps.has(Capability::ReadOwn);
    }
    match doc.privacy {
        Privacy::Public => true,
        Privacy::Shared => {
            caps.has(Capability::ReadShared) && doc.shared_with.contains(&caller.user_id)
        }
        Privacy::Private => false,
    }
}

/// Whether the caller may write `doc` (modify, delete, submit or cancel
/// verification).
pub fn can_write_document(
    caller: &CallerIdentity,
    caps: Capabilities,
    doc: &DocumentRecord,
) -> bool {
    caps.has(Capability::WriteAll)
        || (doc.user_id == caller.user_id && caps.has(Capability::WriteOwn))
}

// ── Secret token ────────────────────────────────────────────────────────────

/// The shared bearer secret.
///
/// Custom `Debug` redacts the value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct SecretToken(String);

impl SecretToken {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the secret value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretToken").field(&"[REDACTED]").finish()
    }
}

// ── Token validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
///
/// When lengths differ, performs a dummy comparison to avoid leaking
/// length information through timing variance.
fn constant_time_secret_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token of the form `{role}:{user_id}:{secret}`.
///
/// When `expected_secret` is `None` (development mode) the secret
/// segment is not checked, but role and user id are still required.
pub fn parse_bearer_token(
    provided: &str,
    expected_secret: Option<&str>,
) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();
    if parts.len() != 3 {
        return Err("invalid token format — expected {role}:{user_id}:{secret}".into());
    }

    let (role_str, user_str, secret) = (parts[0], parts[1], parts[2]);

    if let Some(expected) = expected_secret {
        if !constant_time_secret_eq(secret, expected) {
            return Err("invalid bearer token".into());
        }
    }

    let role = Role::parse(role_str).ok_or_else(|| format!("unknown role: {role_str}"))?;
    let user_id = user_str
        .parse::<Uuid>()
        .map_err(|e| format!("invalid user_id: {e}"))?;

    Ok(CallerIdentity { user_id, role })
}

// ── Middleware ──────────────────────────────────────────────────────────────

/// Build a 401 response in the standard error body format.
fn unauthorized(message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.into(),
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// Extract and validate the bearer token from the Authorization header.
///
/// Injects the resolved [`CallerIdentity`] into request extensions for
/// downstream handlers and records the login for the active-user count.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = header_value else {
        return unauthorized("missing bearer token");
    };

    let expected = state.config.auth_token.as_ref().map(|t| t.as_str());
    match parse_bearer_token(token, expected) {
        Ok(identity) => {
            state.record_login(identity.user_id, identity.role);
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(reason) => unauthorized(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn caller(role: Role) -> CallerIdentity {
        CallerIdentity {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    fn doc_owned_by(owner: Uuid, privacy: Privacy) -> DocumentRecord {
        use credence_core::{DocumentKind, FileReference};
        use credence_state::DocumentStatus;
        let now = Utc::now();
        DocumentRecord {
            id: Uuid::new_v4(),
            user_id: owner,
            display_name: "BSc Computer Science".into(),
            kind: DocumentKind::Degree,
            issuer: "Example University".into(),
            institution_id: None,
            file_reference: FileReference::new("blobs/degree.pdf").unwrap(),
            file_size: 1024,
            content_type: "application/pdf".into(),
            uploaded_at: now,
            expires_at: None,
            status: DocumentStatus::Uploaded,
            privacy,
            shared_with: Vec::new(),
            metadata: serde_json::json!({}),
            active_request_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    // ── Token parsing ────────────────────────────────────────────────

    #[test]
    fn parse_valid_token() {
        let user = Uuid::new_v4();
        let token = format!("job_seeker:{user}:s3cret");
        let identity = parse_bearer_token(&token, Some("s3cret")).unwrap();
        assert_eq!(identity.role, Role::JobSeeker);
        assert_eq!(identity.user_id, user);
    }

    #[test]
    fn parse_rejects_wrong_secret() {
        let token = format!("employer:{}:wrong", Uuid::new_v4());
        assert!(parse_bearer_token(&token, Some("s3cret")).is_err());
    }

    #[test]
    fn parse_rejects_unknown_role() {
        let token = format!("superuser:{}:s3cret", Uuid::new_v4());
        assert!(parse_bearer_token(&token, Some("s3cret")).is_err());
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(parse_bearer_token("just-a-secret", Some("just-a-secret")).is_err());
        assert!(parse_bearer_token("university:not-a-uuid:s3cret", Some("s3cret")).is_err());
    }

    #[test]
    fn parse_dev_mode_skips_secret_but_requires_identity() {
        let user = Uuid::new_v4();
        let token = format!("university:{user}:anything");
        let identity = parse_bearer_token(&token, None).unwrap();
        assert_eq!(identity.role, Role::University);
        assert!(parse_bearer_token("no-identity", None).is_err());
    }

    // ── Capability resolution ────────────────────────────────────────

    #[test]
    fn base_capabilities_exclude_fleet_access() {
        let state = AppState::new();
        let c = caller(Role::JobSeeker);
        let caps = c.capabilities(&state);
        assert!(caps.has(Capability::ReadOwn));
        assert!(caps.has(Capability::WriteOwn));
        assert!(!caps.has(Capability::ReadAll));
        assert!(!caps.has(Capability::WriteAll));
        assert!(!caps.has(Capability::ReadStats));
        assert!(caps.require(Capability::ReadStats).is_err());
    }

    #[test]
    fn admin_flag_resolves_per_call() {
        let state = AppState::new();
        let c = caller(Role::Employer);

        assert!(!c.capabilities(&state).has(Capability::ReadAll));

        state.admins.grant(c.user_id);
        assert!(c.capabilities(&state).has(Capability::ReadAll));
        assert!(c.capabilities(&state).has(Capability::ReadStats));

        // Revocation is visible on the very next resolution.
        state.admins.revoke(c.user_id);
        assert!(!c.capabilities(&state).has(Capability::ReadAll));
    }

    // ── Document visibility ──────────────────────────────────────────

    #[test]
    fn owner_reads_and_writes_own_private_document() {
        let state = AppState::new();
        let c = caller(Role::JobSeeker);
        let doc = doc_owned_by(c.user_id, Privacy::Private);
        let caps = c.capabilities(&state);
        assert!(can_read_document(&c, caps, &doc));
        assert!(can_write_document(&c, caps, &doc));
    }

    #[test]
    fn stranger_cannot_touch_private_document() {
        let state = AppState::new();
        let owner = caller(Role::JobSeeker);
        let stranger = caller(Role::Employer);
        let doc = doc_owned_by(owner.user_id, Privacy::Private);
        let caps = stranger.capabilities(&state);
        assert!(!can_read_document(&stranger, caps, &doc));
        assert!(!can_write_document(&stranger, caps, &doc));
    }

    #[test]
    fn shared_document_readable_only_by_designees() {
        let state = AppState::new();
        let owner = caller(Role::JobSeeker);
        let designee = caller(Role::Employer);
        let stranger = caller(Role::Employer);

        let mut doc = doc_owned_by(owner.user_id, Privacy::Shared);
        doc.shared_with.push(designee.user_id);

        assert!(can_read_document(&designee, designee.capabilities(&state), &doc));
        assert!(!can_read_document(&stranger, stranger.capabilities(&state), &doc));
        // Read access never implies write access.
        assert!(!can_write_document(&designee, designee.capabilities(&state), &doc));
    }

    #[test]
    fn public_document_readable_by_anyone() {
        let state = AppState::new();
        let owner = caller(Role::JobSeeker);
        let stranger = caller(Role::University);
        let doc = doc_owned_by(owner.user_id, Privacy::Public);
        assert!(can_read_document(&stranger, stranger.capabilities(&state), &doc));
        assert!(!can_write_document(&stranger, stranger.capabilities(&state), &doc));
    }

    #[test]
    fn admin_reads_and_writes_everything() {
        let state = AppState::new();
        let owner = caller(Role::JobSeeker);
        let admin = caller(Role::University);
        state.admins.grant(admin.user_id);

        let doc = doc_owned_by(owner.user_id, Privacy::Private);
        let caps = admin.capabilities(&state);
        assert!(can_read_document(&admin, caps, &doc));
        assert!(can_write_document(&admin, caps, &doc));
    }

    // ── Secret hygiene ───────────────────────────────────────────────

    #[test]
    fn secret_token_debug_is_redacted() {
        let token = SecretToken::new("super-secret-value");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn constant_time_eq_handles_length_mismatch() {
        assert!(!constant_time_secret_eq("short", "a-much-longer-secret"));
        assert!(constant_time_secret_eq("same", "same"));
    }
}
