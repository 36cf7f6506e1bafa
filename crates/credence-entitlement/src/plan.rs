//! # Plan Tiers
//!
//! The pricing plans a subscription can bind to, and the verification
//! limit each carries. Payment capture is out of scope; a tier here is
//! purely an entitlement level.

use serde::{Deserialize, Serialize};

/// A subscription plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    /// The implicit default for users without a subscription.
    Free,
    /// Entry paid tier.
    Starter,
    /// Individual professional tier.
    Professional,
    /// University / employer tier with unmetered verification.
    Institution,
}

impl PlanTier {
    /// Verifications permitted per billing cycle. `None` means unlimited.
    pub fn verification_limit(&self) -> Option<u32> {
        match self {
            Self::Free => Some(3),
            Self::Starter => Some(25),
            Self::Professional => Some(100),
            Self::Institution => None,
        }
    }

    /// Return the wire-format string for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Institution => "institution",
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
