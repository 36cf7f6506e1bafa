//! # credence-state — Lifecycle State Machines for Credence
//!
//! Owns the two state spaces at the heart of the verification engine and
//! the derivation rule connecting them:
//!
//! - [`request`] — the verification request lifecycle
//!   (`pending → in_progress → {completed | failed | cancelled}`), with an
//!   ordered transition log and structured rejection of invalid edges.
//! - [`document`] — document trust status and the rule deriving it from
//!   verification outcomes (determination, confidence, tamper signals),
//!   plus read-time expiry.
//! - [`event`] — the lifecycle event types emitted on committed
//!   transitions for external notifiers.
//!
//! This crate holds no storage and no I/O; callers apply the machines
//! under whatever concurrency discipline their store provides.

pub mod document;
pub mod event;
pub mod request;

pub use document::{
    status_from_outcome, DocumentStatus, VerificationOutcome,
    DEFAULT_VERIFIED_CONFIDENCE_THRESHOLD,
};
pub use event::{EntityKind, LifecycleEvent};
pub use request::{
    RequestError, RequestKind, TransitionRecord, VerificationRequest, VerificationStatus,
};
