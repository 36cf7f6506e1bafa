//! # Document Status Derivation
//!
//! A document's trust status is never written directly by a client; it is
//! a deterministic function of its verification request corpus. This
//! module owns that derivation: the status vocabulary, the mapping from
//! an analyzer outcome to a status, and the read-time expiry rule.

use serde::{Deserialize, Serialize};

use credence_core::{Determination, Timestamp};

/// Confidence at or above which a positive determination reads as
/// `Verified`. Below it, the document is `PartialVerified`.
///
/// The analyzer reports confidence in `0..=1`. 0.85 keeps clearly-strong
/// matches verified while routing borderline ones to the suspicious
/// bucket for human attention. Deployments tune this via configuration.
pub const DEFAULT_VERIFIED_CONFIDENCE_THRESHOLD: f64 = 0.85;

// ─── Document status ─────────────────────────────────────────────────

/// The trust status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Uploaded; no verification request yet.
    Uploaded,
    /// A verification request has been admitted and is outstanding.
    Pending,
    /// A request completed with a positive determination above threshold.
    Verified,
    /// A request completed negative, or analysis failed.
    Failed,
    /// Mixed signals: sub-threshold confidence, ambiguous determination,
    /// or suspected tampering alongside a partial match.
    PartialVerified,
    /// Past its expiry date. Derived at read time, never stored.
    Expired,
}

impl DocumentStatus {
    /// Return the wire-format string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Failed => "failed",
            Self::PartialVerified => "partial_verified",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Outcome ─────────────────────────────────────────────────────────

/// The typed result of a completed verification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// The analyzer's trust determination.
    pub determination: Determination,
    /// Analyzer confidence in `0..=1`.
    pub confidence: f64,
    /// The analyzer flagged signs of tampering.
    pub tamper_suspected: bool,
}

/// Map a verification outcome to the document status it produces.
///
/// - `Negative` → [`DocumentStatus::Failed`] regardless of confidence.
/// - `Ambiguous` → [`DocumentStatus::PartialVerified`].
/// - `Positive` with a tamper signal, or with confidence below
///   `threshold` → [`DocumentStatus::PartialVerified`].
/// - `Positive` at or above `threshold` → [`DocumentStatus::Verified`].
pub fn status_from_outcome(outcome: &VerificationOutcome, threshold: f64) -> DocumentStatus {
    match outcome.determination {
        Determination::Negative => DocumentStatus::Failed,
        Determination::Ambiguous => DocumentStatus::PartialVerified,
        Determination::Positive => {
            if outcome.tamper_suspected || outcome.confidence < threshold {
                DocumentStatus::PartialVerified
            } else {
                DocumentStatus::Verified
            }
        }
    }
}

/// Apply the read-time expiry rule.
///
/// A document whose expiry instant has arrived reads as `Expired`
/// independent of any verification outcome. The stored status is left
/// untouched; expiry is a view, not a transition.
pub fn effective_status(
    stored: DocumentStatus,
    expires_at: Option<Timestamp>,
    now: Timestamp,
) -> DocumentStatus {
    match expires_at {
        Some(expiry) if now >= expiry => DocumentStatus::Expired,
        _ => stored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(determination: Determination, confidence: f64) -> VerificationOutcome {
        VerificationOutcome {
            determination,
            confidence,
            tamper_suspected: false,
        }
    }

    const T: f64 = DEFAULT_VERIFIED_CONFIDENCE_THRESHOLD;

    #[test]
    fn positive_high_confidence_is_verified() {
        let o = outcome(Determination::Positive, 0.95);
        assert_eq!(status_from_outcome(&o, T), DocumentStatus::Verified);
    }

    #[test]
    fn positive_at_threshold_is_verified() {
        let o = outcome(Determination::Positive, T);
        assert_eq!(status_from_outcome(&o, T), DocumentStatus::Verified);
    }

    #[test]
    fn positive_low_confidence_is_partial() {
        let o = outcome(Determination::Positive, 0.4);
        assert_eq!(status_from_outcome(&o, T), DocumentStatus::PartialVerified);
    }

    #[test]
    fn negative_is_failed_even_at_full_confidence() {
        let o = outcome(Determination::Negative, 1.0);
        assert_eq!(status_from_outcome(&o, T), DocumentStatus::Failed);
    }

    #[test]
    fn ambiguous_is_partial() {
        let o = outcome(Determination::Ambiguous, 0.99);
        assert_eq!(status_from_outcome(&o, T), DocumentStatus::PartialVerified);
    }

    #[test]
    fn tamper_signal_overrides_high_confidence() {
        let o = VerificationOutcome {
            determination: Determination::Positive,
            confidence: 0.97,
            tamper_suspected: true,
        };
        assert_eq!(status_from_outcome(&o, T), DocumentStatus::PartialVerified);
    }

    #[test]
    fn expiry_overrides_stored_status_at_read_time() {
        let now = Timestamp::parse("2026-06-01T00:00:00Z").unwrap();
        let past = Timestamp::parse("2026-05-01T00:00:00Z").unwrap();
        let future = Timestamp::parse("2026-07-01T00:00:00Z").unwrap();

        assert_eq!(
            effective_status(DocumentStatus::Verified, Some(past), now),
            DocumentStatus::Expired
        );
        assert_eq!(
            effective_status(DocumentStatus::Verified, Some(future), now),
            DocumentStatus::Verified
        );
        assert_eq!(
            effective_status(DocumentStatus::Uploaded, None, now),
            DocumentStatus::Uploaded
        );
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let instant = Timestamp::parse("2026-06-01T00:00:00Z").unwrap();
        assert_eq!(
            effective_status(DocumentStatus::Verified, Some(instant), instant),
            DocumentStatus::Expired
        );
    }

    #[test]
    fn status_wire_format() {
        assert_eq!(
            serde_json::to_string(&DocumentStatus::PartialVerified).unwrap(),
            r#""partial_verified""#
        );
    }
}
