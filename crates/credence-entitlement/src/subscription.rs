//! # Subscription Quota Accounting
//!
//! A subscription binds a user to a [`PlanTier`] for a billing-cycle
//! window `[period_start, period_end)` and counts the verifications
//! consumed within it.
//!
//! Invariant: `verifications_used` never exceeds the tier limit when the
//! limit is finite. [`Subscription::try_consume`] is the only mutation
//! path and refuses the increment that would cross the boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use credence_core::{Timestamp, UserId};

use crate::plan::PlanTier;

/// Length of the implicit free-tier billing cycle, in days.
const FREE_CYCLE_DAYS: i64 = 30;

/// Lifecycle status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// In good standing.
    Active,
    /// Renewal payment outstanding; no longer admits work.
    PastDue,
    /// Ended by the user or an operator.
    Cancelled,
}

/// Errors raised by the entitlement gate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntitlementError {
    /// The billing cycle's verification quota is exhausted.
    #[error("verification quota exceeded: {used} of {limit} used this cycle")]
    QuotaExceeded {
        /// Verifications consumed this cycle.
        used: u32,
        /// The tier's cycle limit.
        limit: u32,
    },
}

/// A user's subscription: plan binding plus cycle accounting.
///
/// At most one subscription exists per user (the store is keyed by
/// user id), which realizes the one-active-subscription uniqueness
/// constraint by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription identifier.
    pub id: Uuid,
    /// The subscribing user.
    pub user_id: UserId,
    /// The bound plan tier.
    pub tier: PlanTier,
    /// Lifecycle status.
    pub status: SubscriptionStatus,
    /// Verifications consumed in the current cycle.
    pub verifications_used: u32,
    /// Cycle start (inclusive).
    pub period_start: Timestamp,
    /// Cycle end (exclusive).
    pub period_end: Timestamp,
}

impl Subscription {
    /// Create an active subscription for the given cycle window.
    pub fn new(
        user_id: UserId,
        tier: PlanTier,
        period_start: Timestamp,
        period_end: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            tier,
            status: SubscriptionStatus::Active,
            verifications_used: 0,
            period_start,
            period_end,
        }
    }

    /// The implicit default for users without a subscription: a fresh
    /// free-tier cycle starting at `now`.
    pub fn free_tier(user_id: UserId, now: Timestamp) -> Self {
        Self::new(user_id, PlanTier::Free, now, now.plus_days(FREE_CYCLE_DAYS))
    }

    /// Whether this subscription admits work at `now`: active status and
    /// `now` inside `[period_start, period_end)`.
    pub fn is_current(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active
            && self.period_start <= now
            && now < self.period_end
    }

    /// Verifications still available this cycle. `None` means unlimited.
    pub fn remaining(&self) -> Option<u32> {
        self.tier
            .verification_limit()
            .map(|limit| limit.saturating_sub(self.verifications_used))
    }

    /// Consume one verification unit, returning the new used count.
    ///
    /// Fails with [`EntitlementError::QuotaExceeded`] when the cycle
    /// limit is exhausted. Callers must run this inside their store's
    /// atomic update so two racing admits cannot both pass the boundary.
    pub fn try_consume(&mut self) -> Result<u32, EntitlementError> {
        if let Some(limit) = self.tier.verification_limit() {
            if self.verifications_used >= limit {
                return Err(EntitlementError::QuotaExceeded {
                    used: self.verifications_used,
                    limit,
                });
            }
        }
        self.verifications_used += 1;
        Ok(self.verifications_used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> (Timestamp, Timestamp) {
        (
            Timestamp::parse("2026-03-01T00:00:00Z").unwrap(),
            Timestamp::parse("2026-04-01T00:00:00Z").unwrap(),
        )
    }

    #[test]
    fn consume_until_exhausted() {
        let (start, end) = window();
        let mut sub = Subscription::new(UserId::new(), PlanTier::Free, start, end);

        assert_eq!(sub.try_consume().unwrap(), 1);
        assert_eq!(sub.try_consume().unwrap(), 2);
        assert_eq!(sub.try_consume().unwrap(), 3);
        assert_eq!(
            sub.try_consume(),
            Err(EntitlementError::QuotaExceeded { used: 3, limit: 3 })
        );
        // The failed consume did not move the counter.
        assert_eq!(sub.verifications_used, 3);
    }

    #[test]
    fn unlimited_tier_never_exhausts() {
        let (start, end) = window();
        let mut sub = Subscription::new(UserId::new(), PlanTier::Institution, start, end);
        for expected in 1..=500u32 {
            assert_eq!(sub.try_consume().unwrap(), expected);
        }
        assert_eq!(sub.remaining(), None);
    }

    #[test]
    fn remaining_counts_down() {
        let (start, end) = window();
        let mut sub = Subscription::new(UserId::new(), PlanTier::Starter, start, end);
        assert_eq!(sub.remaining(), Some(25));
        sub.try_consume().unwrap();
        assert_eq!(sub.remaining(), Some(24));
    }

    #[test]
    fn window_is_half_open() {
        let (start, end) = window();
        let sub = Subscription::new(UserId::new(), PlanTier::Free, start, end);

        assert!(sub.is_current(start), "start is inclusive");
        assert!(!sub.is_current(end), "end is exclusive");

        let inside = Timestamp::parse("2026-03-15T12:00:00Z").unwrap();
        let before = Timestamp::parse("2026-02-28T23:59:59Z").unwrap();
        assert!(sub.is_current(inside));
        assert!(!sub.is_current(before));
    }

    #[test]
    fn non_active_status_is_not_current() {
        let (start, end) = window();
        let inside = Timestamp::parse("2026-03-15T12:00:00Z").unwrap();

        let mut sub = Subscription::new(UserId::new(), PlanTier::Professional, start, end);
        sub.status = SubscriptionStatus::PastDue;
        assert!(!sub.is_current(inside));

        sub.status = SubscriptionStatus::Cancelled;
        assert!(!sub.is_current(inside));
    }

    #[test]
    fn free_tier_default_window() {
        let now = Timestamp::parse("2026-03-01T00:00:00Z").unwrap();
        let sub = Subscription::free_tier(UserId::new(), now);
        assert_eq!(sub.tier, PlanTier::Free);
        assert_eq!(sub.period_start, now);
        assert_eq!(sub.period_end, now.plus_days(30));
        assert!(sub.is_current(now));
    }

    #[test]
    fn serde_roundtrip() {
        let (start, end) = window();
        let sub = Subscription::new(UserId::new(), PlanTier::Starter, start, end);
        let json = serde_json::to_string(&sub).unwrap();
        let parsed: Subscription = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sub);
    }
}
