//! # Aggregation Reporter
//!
//! Read-side fleet summary for operators: verification requests grouped
//! by the document status they most recently produced, plus the count of
//! users active in the trailing 30 days. Pure computation over the
//! stores — no side effects, tolerant of an empty corpus, and degrades
//! (rather than fails) when the active-user directory is unavailable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use credence_core::Timestamp;
use credence_state::{status_from_outcome, DocumentStatus, VerificationStatus};

use crate::state::{AppState, Store, UserRecord};

/// Days of login recency that count as "active".
const ACTIVE_WINDOW_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Active-user directory
// ---------------------------------------------------------------------------

/// The active-user lookup source is temporarily unreachable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("active-user directory unavailable")]
pub struct DirectoryUnavailable;

/// Login-recency lookup backed by the user mirror.
///
/// In production the mirror is fed by the identity provider; the
/// availability switch models that upstream being down (used by tests
/// and outage drills). Successful counts are cached so a later outage
/// can degrade to the last-known value instead of zero.
#[derive(Debug, Clone)]
pub struct ActiveUserDirectory {
    users: Store<UserRecord>,
    available: Arc<AtomicBool>,
    last_known: Arc<RwLock<Option<u64>>>,
}

impl ActiveUserDirectory {
    /// Wrap the user mirror.
    pub fn new(users: Store<UserRecord>) -> Self {
        Self {
            users,
            available: Arc::new(AtomicBool::new(true)),
            last_known: Arc::new(RwLock::new(None)),
        }
    }

    /// Count distinct users whose last login is at or after `cutoff`.
    pub fn count_active_since(&self, cutoff: Timestamp) -> Result<u64, DirectoryUnavailable> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(DirectoryUnavailable);
        }
        let cutoff = *cutoff.as_datetime();
        let count = self
            .users
            .list()
            .into_iter()
            .filter(|u| u.last_login_at.is_some_and(|t| t >= cutoff))
            .count() as u64;
        *self.last_known.write() = Some(count);
        Ok(count)
    }

    /// The most recent successful count, if any.
    pub fn last_known(&self) -> Option<u64> {
        *self.last_known.read()
    }

    /// Toggle upstream availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Fleet stats
// ---------------------------------------------------------------------------

/// Fleet-wide verification summary.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FleetStats {
    /// Requests counted into the four buckets below (cancelled requests
    /// are excluded).
    pub total_verifications: u64,
    /// Completed with a verified outcome.
    pub verified_count: u64,
    /// Still pending or in progress.
    pub pending_count: u64,
    /// Completed with a partial/suspicious outcome.
    pub suspicious_count: u64,
    /// Completed negative, or failed in analysis.
    pub failed_count: u64,
    /// Distinct users with a login in the trailing 30 days.
    pub active_users_30d: u64,
    /// The active-user source was unavailable; the count is last-known
    /// or zero.
    pub active_users_degraded: bool,
    /// The observation point the stats were computed at.
    pub as_of: DateTime<Utc>,
}

/// Compute fleet stats as of the given instant.
pub fn compute_stats(state: &AppState, as_of: Timestamp) -> FleetStats {
    let threshold = state.config.verified_confidence_threshold;

    let mut verified = 0u64;
    let mut pending = 0u64;
    let mut suspicious = 0u64;
    let mut failed = 0u64;

    for request in state.requests.list() {
        match request.status {
            VerificationStatus::Pending | VerificationStatus::InProgress => pending += 1,
            VerificationStatus::Failed => failed += 1,
            VerificationStatus::Cancelled => {}
            VerificationStatus::Completed => match request.outcome {
                Some(outcome) => match status_from_outcome(&outcome, threshold) {
                    DocumentStatus::Verified => verified += 1,
                    DocumentStatus::PartialVerified => suspicious += 1,
                    DocumentStatus::Failed => failed += 1,
                    // The mapping never yields other statuses.
                    _ => {}
                },
                // A completed request without an outcome is corrupt
                // enough to count as failed.
                None => failed += 1,
            },
        }
    }

    let cutoff = as_of.minus_days(ACTIVE_WINDOW_DAYS);
    let (active_users, degraded) = match state.directory.count_active_since(cutoff) {
        Ok(count) => (count, false),
        Err(err) => {
            let fallback = state.directory.last_known().unwrap_or(0);
            tracing::warn!(
                error = %err,
                fallback,
                "active-user directory unavailable; reporting last-known count"
            );
            (fallback, true)
        }
    };

    FleetStats {
        total_verifications: verified + pending + suspicious + failed,
        verified_count: verified,
        pending_count: pending,
        suspicious_count: suspicious,
        failed_count: failed,
        active_users_30d: active_users,
        active_users_degraded: degraded,
        as_of: *as_of.as_datetime(),
    }
}
