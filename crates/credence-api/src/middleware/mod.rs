//! # Middleware
//!
//! Tower-layer middleware for the API surface:
//!
//! - `metrics` — request/error counters.
//! - `rate_limit` — per-caller token bucket.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly in the
//! application assembly.

pub mod metrics;
pub mod rate_limit;
