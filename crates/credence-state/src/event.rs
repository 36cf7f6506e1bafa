//! # Lifecycle Events
//!
//! Event types describing committed lifecycle transitions. External
//! notifiers subscribe to a stream of these instead of polling; the
//! engine emits one only after the corresponding store write has
//! committed, never for intermediate or rejected transitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use credence_core::{DocumentId, RequestId, Timestamp};

use crate::document::DocumentStatus;
use crate::request::VerificationStatus;

/// The kind of entity a lifecycle event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A credential document.
    Document,
    /// A verification request.
    VerificationRequest,
}

/// A committed lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// What kind of entity changed.
    pub entity_kind: EntityKind,
    /// The entity's identifier.
    pub entity_id: Uuid,
    /// The state the entity entered, in wire format.
    pub new_state: String,
    /// When the transition committed.
    pub occurred_at: Timestamp,
}

impl LifecycleEvent {
    /// Event for a committed document status change.
    pub fn document(id: DocumentId, status: DocumentStatus) -> Self {
        Self {
            entity_kind: EntityKind::Document,
            entity_id: *id.as_uuid(),
            new_state: status.as_str().to_string(),
            occurred_at: Timestamp::now(),
        }
    }

    /// Event for a committed verification request transition.
    pub fn request(id: RequestId, status: VerificationStatus) -> Self {
        Self {
            entity_kind: EntityKind::VerificationRequest,
            entity_id: *id.as_uuid(),
            new_state: status.as_str().to_string(),
            occurred_at: Timestamp::now(),
        }
    }
}
