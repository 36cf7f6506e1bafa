//! # API Route Modules
//!
//! Route modules for the Credence API surface:
//!
//! - `documents` — blob upload, document CRUD, privacy/sharing.
//! - `verifications` — submission, inspection, cancellation of
//!   verification requests.
//! - `portfolio` — unauthenticated read-only view of public documents.
//! - `admin` — operator console: fleet stats, review queue, admin-flag
//!   grants, subscription assignment.

pub mod admin;
pub mod documents;
pub mod portfolio;
pub mod verifications;
