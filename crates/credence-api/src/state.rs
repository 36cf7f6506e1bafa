//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! All records live in thread-safe in-memory stores; durable persistence
//! belongs to an external store behind this layer. The generic
//! [`Store`] provides the atomic read-validate-update primitive that the
//! dispatcher and entitlement gate rely on: a `try_update` closure runs
//! under a single write lock, so "claim if currently pending" and
//! "increment if under quota" are conditional updates, not
//! read-then-write races.
//!
//! ## Lock discipline
//!
//! When document and request entries must change together, the request
//! update runs inside the document's `try_update` closure. Lock order is
//! therefore documents → requests everywhere; no code path takes them in
//! the opposite order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use credence_analyzer::{Analyzer, MockAnalyzer};
use credence_core::{DocumentKind, FileReference, Privacy, Timestamp};
use credence_entitlement::Subscription;
use credence_state::{DocumentStatus, VerificationRequest, DEFAULT_VERIFIED_CONFIDENCE_THRESHOLD};

use crate::auth::{Role, SecretToken};
use crate::blob::BlobStore;
use crate::events::EventBus;
use crate::reporter::ActiveUserDirectory;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
/// `parking_lot::RwLock` is non-poisonable — a panicking writer does not
/// permanently corrupt the store.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// Retrieve a record, inserting the default built by `f` if absent.
    ///
    /// Runs under the write lock, so two racing callers cannot both
    /// insert (one would clobber the other's counter state).
    pub fn get_or_insert_with(&self, id: Uuid, f: impl FnOnce() -> T) -> T {
        self.data.write().entry(id).or_insert_with(f).clone()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Update a record in place. Returns the updated record, or `None`
    /// if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure receives `&mut T` and may inspect the current state,
    /// validate preconditions, mutate, and return `Ok(R)` or `Err(E)`.
    /// The entire operation runs under a single write lock, eliminating
    /// TOCTOU races between read and update.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)` with
    /// the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Record Types -------------------------------------------------------------

/// Document record.
///
/// `status` is never written by request handlers directly; the dispatcher
/// recomputes it from the verification request corpus on every committed
/// transition. `active_request_id` is the at-most-one-in-flight slot:
/// claiming it is the serialization point for concurrent submits.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentRecord {
    pub id: Uuid,
    /// The owning user. Ownership gates every write.
    pub user_id: Uuid,
    pub display_name: String,
    /// The kind of credential artifact.
    #[schema(value_type = String)]
    pub kind: DocumentKind,
    /// Name of the issuing organization as printed on the document.
    pub issuer: String,
    /// Issuing institution registered with the platform, if known.
    pub institution_id: Option<Uuid>,
    /// Handle into the external blob store.
    #[schema(value_type = String)]
    pub file_reference: FileReference,
    pub file_size: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    /// Expiry instant, if the credential expires. Expiry is applied at
    /// read time; it never rewrites `status`.
    pub expires_at: Option<DateTime<Utc>>,
    /// Stored trust status (see module docs for the derivation rule).
    #[schema(value_type = String)]
    pub status: DocumentStatus,
    #[schema(value_type = String)]
    pub privacy: Privacy,
    /// Principals the owner designated as readers of a `shared` document.
    #[serde(default)]
    pub shared_with: Vec<Uuid>,
    pub metadata: serde_json::Value,
    /// The one non-terminal verification request, if any.
    pub active_request_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// The status a reader observes at `now`: the stored status with the
    /// read-time expiry rule applied.
    pub fn effective_status(&self, now: Timestamp) -> DocumentStatus {
        let expires = self.expires_at.map(Timestamp::from_utc);
        credence_state::document::effective_status(self.status, expires, now)
    }
}

/// A platform user, mirrored from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRecord {
    pub id: Uuid,
    pub display_name: String,
    /// Primary role. Admin status is NOT here — it is a separately
    /// granted flag resolved per call from the [`AdminRegistry`].
    #[schema(value_type = String)]
    pub role: Role,
    /// Most recent authenticated request, feeding the active-user count.
    pub last_login_at: Option<DateTime<Utc>>,
}

// -- Admin registry -----------------------------------------------------------

/// The grantable admin flag, held apart from user records and sessions.
///
/// Admin status is resolved per call via [`AdminRegistry::is_admin`];
/// nothing caches it on the request identity, so a revocation takes
/// effect on the next call.
#[derive(Debug, Clone, Default)]
pub struct AdminRegistry {
    grants: Arc<RwLock<HashSet<Uuid>>>,
}

impl AdminRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant the admin flag to a user.
    pub fn grant(&self, user_id: Uuid) {
        self.grants.write().insert(user_id);
    }

    /// Revoke the admin flag from a user.
    pub fn revoke(&self, user_id: Uuid) {
        self.grants.write().remove(&user_id);
    }

    /// Whether the user currently holds the admin flag.
    pub fn is_admin(&self, user_id: Uuid) -> bool {
        self.grants.read().contains(&user_id)
    }
}

// -- Configuration ------------------------------------------------------------

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen port.
    pub port: u16,
    /// Shared bearer secret. `None` disables secret checking
    /// (development mode; identities are still required).
    pub auth_token: Option<SecretToken>,
    /// Confidence at or above which a positive determination reads as
    /// verified.
    pub verified_confidence_threshold: f64,
    /// Bound on each analyzer call.
    pub analyzer_timeout: std::time::Duration,
    /// Base delay for the single transient-error retry; the actual delay
    /// doubles per attempt.
    pub retry_base_delay: std::time::Duration,
    /// When true, `submit` applies the terminal transition before
    /// returning. When false, resolution runs in a spawned task.
    pub blocking_dispatch: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            verified_confidence_threshold: DEFAULT_VERIFIED_CONFIDENCE_THRESHOLD,
            analyzer_timeout: std::time::Duration::from_secs(30),
            retry_base_delay: std::time::Duration::from_millis(250),
            blocking_dispatch: false,
        }
    }
}

// -- AppState -----------------------------------------------------------------

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Documents keyed by id. The (user, status) index of the logical
    /// layout is realized by filtered scans over this store.
    pub documents: Store<DocumentRecord>,
    /// Verification requests keyed by id; the (document, status) index
    /// is likewise a filtered scan.
    pub requests: Store<VerificationRequest>,
    /// Subscriptions keyed by **user id** — one active subscription per
    /// user holds by construction.
    pub subscriptions: Store<Subscription>,
    /// Users mirrored from the identity provider.
    pub users: Store<UserRecord>,
    /// The grantable admin flag.
    pub admins: AdminRegistry,
    /// Active-user lookup for the aggregation reporter.
    pub directory: ActiveUserDirectory,
    /// Blob store adapter (external collaborator stand-in).
    pub blobs: BlobStore,
    /// The external analyzer client.
    pub analyzer: Analyzer,
    /// Committed-transition event stream.
    pub events: EventBus,
}

impl AppState {
    /// State with default configuration and a mock analyzer, suitable
    /// for tests and development.
    pub fn new() -> Self {
        Self::with_parts(AppConfig::default(), Analyzer::Mock(MockAnalyzer::new()))
    }

    /// State with explicit configuration and analyzer.
    pub fn with_parts(config: AppConfig, analyzer: Analyzer) -> Self {
        let users: Store<UserRecord> = Store::new();
        Self {
            config,
            documents: Store::new(),
            requests: Store::new(),
            subscriptions: Store::new(),
            directory: ActiveUserDirectory::new(users.clone()),
            users,
            admins: AdminRegistry::new(),
            blobs: BlobStore::new(),
            analyzer,
            events: EventBus::new(),
        }
    }

    /// Per-call admin lookup (never cached on the session).
    pub fn is_admin(&self, user_id: Uuid) -> bool {
        self.admins.is_admin(user_id)
    }

    /// Record an authenticated request: upsert the user mirror and stamp
    /// `last_login_at`.
    pub fn record_login(&self, user_id: Uuid, role: Role) {
        let now = Utc::now();
        self.users.get_or_insert_with(user_id, || UserRecord {
            id: user_id,
            display_name: String::new(),
            role,
            last_login_at: None,
        });
        self.users.update(&user_id, |u| {
            u.last_login_at = Some(now);
        });
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
