//! # credence-entitlement — The Entitlement Gate
//!
//! Quota enforcement for verification work. A user's subscription binds
//! them to a plan tier; each admitted verification consumes one unit of
//! the tier's limit within the current billing-cycle window. The gate's
//! single question — "may this user start another verification right
//! now?" — is answered by [`Subscription::try_consume`].
//!
//! This crate holds the accounting rules only. Atomicity of
//! check-and-increment under concurrent admits is the caller's store
//! discipline (the API layer runs `try_consume` inside a single
//! write-locked update), so the arithmetic here can stay plain.

pub mod plan;
pub mod subscription;

pub use plan::PlanTier;
pub use subscription::{EntitlementError, Subscription, SubscriptionStatus};
