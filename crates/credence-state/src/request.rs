//! # Verification Request State Machine
//!
//! Models the lifecycle of a single verification attempt against a
//! document, from admission through terminal resolution.
//!
//! ## States
//!
//! ```text
//! Pending ──▶ InProgress ──▶ Completed (terminal)
//!    │            │
//!    │            ├──▶ Failed (terminal)
//!    │            │
//!    └────────────┴──▶ Cancelled (terminal)
//! ```
//!
//! No transition leaves a terminal state; any such attempt is rejected
//! with a structured error. Every accepted transition is appended to an
//! ordered log, so a request carries its own audit trail.
//!
//! Timing invariants enforced here:
//! - `started_at` is set exactly once, on entry to `InProgress`, and is
//!   never earlier than `requested_at`.
//! - `completed_at` is set exactly once, on entry to a terminal state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use credence_core::{DocumentId, RequestId, Timestamp, UserId};

use crate::document::VerificationOutcome;

// ─── Status ──────────────────────────────────────────────────────────

/// The lifecycle state of a verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Admitted by the entitlement gate, not yet claimed for analysis.
    Pending,
    /// Claimed by the dispatcher; the analyzer call is in flight.
    InProgress,
    /// The analyzer returned a determination (terminal).
    Completed,
    /// Analyzer error, timeout, or unrecoverable fault (terminal).
    Failed,
    /// Explicitly cancelled by the requester or an operator (terminal).
    Cancelled,
}

impl VerificationStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether the request still occupies its document's in-flight slot.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    /// Return the wire-format string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Request kind ────────────────────────────────────────────────────

/// How a verification is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Automated analysis by the external analyzer.
    AiAnalysis,
    /// Confirmation against the issuing institution's records.
    InstitutionVerify,
    /// Review by a human operator.
    ManualReview,
}

impl RequestKind {
    /// Return the wire-format string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiAnalysis => "ai_analysis",
            Self::InstitutionVerify => "institution_verify",
            Self::ManualReview => "manual_review",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by verification request transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid verification transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: VerificationStatus,
        /// Attempted target status.
        to: VerificationStatus,
    },

    /// The request is already in a terminal state.
    #[error("verification request is in terminal state {state}")]
    TerminalState {
        /// The terminal status.
        state: VerificationStatus,
    },
}

// ─── Transition log ──────────────────────────────────────────────────

/// Record of a single accepted transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Status before the transition.
    pub from_status: VerificationStatus,
    /// Status after the transition.
    pub to_status: VerificationStatus,
    /// When the transition was applied.
    pub timestamp: Timestamp,
    /// Why the transition happened (dispatcher claim, analyzer verdict,
    /// timeout, operator cancellation, ...).
    pub reason: String,
}

// ─── Verification request ────────────────────────────────────────────

/// One attempt to verify a specific document.
///
/// A request is owned by its parent document and never outlives it.
/// The `metadata` value carries analyzer output (extracted fields,
/// explanation) or the raw error text for failed requests; the typed
/// [`VerificationOutcome`] is stored separately so downstream status
/// derivation never re-parses JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Request identifier.
    pub id: RequestId,
    /// The document this request verifies.
    pub document_id: DocumentId,
    /// The user who requested verification.
    pub requested_by: UserId,
    /// How the verification is performed.
    pub kind: RequestKind,
    /// Current lifecycle status.
    pub status: VerificationStatus,
    /// Higher values are served first in queued views.
    pub priority: i32,
    /// When the request was admitted.
    pub requested_at: Timestamp,
    /// When the dispatcher claimed the request. Set on entry to
    /// `InProgress`, never earlier than `requested_at`.
    pub started_at: Option<Timestamp>,
    /// When the request reached a terminal state.
    pub completed_at: Option<Timestamp>,
    /// The typed outcome, present only for `Completed` requests.
    pub outcome: Option<VerificationOutcome>,
    /// Analyzer output or failure detail.
    pub metadata: serde_json::Value,
    /// Ordered log of all accepted transitions.
    pub transitions: Vec<TransitionRecord>,
}

impl VerificationRequest {
    /// Create a new request in `Pending`.
    pub fn new(
        document_id: DocumentId,
        requested_by: UserId,
        kind: RequestKind,
        priority: i32,
    ) -> Self {
        Self {
            id: RequestId::new(),
            document_id,
            requested_by,
            kind,
            status: VerificationStatus::Pending,
            priority,
            requested_at: Timestamp::now(),
            started_at: None,
            completed_at: None,
            outcome: None,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            transitions: Vec::new(),
        }
    }

    /// Claim the request for analysis (`Pending → InProgress`).
    pub fn start(&mut self, reason: &str) -> Result<(), RequestError> {
        self.require_state(VerificationStatus::Pending, VerificationStatus::InProgress)?;
        // Clamp against requested_at so a coarse clock can never produce
        // started_at < requested_at.
        let now = Timestamp::now().max(self.requested_at);
        self.started_at = Some(now);
        self.do_transition(VerificationStatus::InProgress, reason);
        Ok(())
    }

    /// Record the analyzer's determination (`InProgress → Completed`).
    pub fn complete(
        &mut self,
        outcome: VerificationOutcome,
        reason: &str,
    ) -> Result<(), RequestError> {
        self.require_state(VerificationStatus::InProgress, VerificationStatus::Completed)?;
        self.outcome = Some(outcome);
        self.completed_at = Some(Timestamp::now());
        self.do_transition(VerificationStatus::Completed, reason);
        Ok(())
    }

    /// Record an unrecoverable fault (`InProgress → Failed`).
    pub fn fail(&mut self, reason: &str) -> Result<(), RequestError> {
        self.require_state(VerificationStatus::InProgress, VerificationStatus::Failed)?;
        self.completed_at = Some(Timestamp::now());
        self.do_transition(VerificationStatus::Failed, reason);
        Ok(())
    }

    /// Cancel the request (`Pending | InProgress → Cancelled`).
    pub fn cancel(&mut self, reason: &str) -> Result<(), RequestError> {
        if self.status.is_terminal() {
            return Err(RequestError::TerminalState { state: self.status });
        }
        self.completed_at = Some(Timestamp::now());
        self.do_transition(VerificationStatus::Cancelled, reason);
        Ok(())
    }

    /// Whether the request is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Validate that the request is in the expected state.
    fn require_state(
        &self,
        expected: VerificationStatus,
        target: VerificationStatus,
    ) -> Result<(), RequestError> {
        if self.status.is_terminal() {
            return Err(RequestError::TerminalState { state: self.status });
        }
        if self.status != expected {
            return Err(RequestError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    /// Record a state transition.
    fn do_transition(&mut self, to: VerificationStatus, reason: &str) {
        self.transitions.push(TransitionRecord {
            from_status: self.status,
            to_status: to,
            timestamp: Timestamp::now(),
            reason: reason.to_string(),
        });
        self.status = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
