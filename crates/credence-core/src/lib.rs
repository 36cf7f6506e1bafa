//! # credence-core — Foundational Types for Credence
//!
//! This crate is the bedrock of the Credence platform. It defines the
//! type-system primitives shared by every other crate in the workspace;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `UserId`, `DocumentId`,
//!    `RequestId`, `InstitutionId`, `FileReference` — all newtypes with
//!    validated constructors. No bare strings or bare UUIDs for identifiers
//!    inside the domain crates.
//!
//! 2. **Closed enumerations.** `DocumentKind`, `Privacy`, and `Determination`
//!    are single definitions consumed with exhaustive `match` everywhere.
//!    Adding a variant forces every consumer to handle it.
//!
//! 3. **UTC-only timestamps.** The `Timestamp` type enforces UTC at seconds
//!    precision, so billing-window comparisons and transition ordering are
//!    never subject to timezone drift.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `credence-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod domain;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use domain::{Determination, DocumentKind, Privacy};
pub use error::ValidationError;
pub use identity::{DocumentId, FileReference, InstitutionId, RequestId, UserId};
pub use temporal::Timestamp;
