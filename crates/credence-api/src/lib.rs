//! # credence-api — Axum API Services for Credence
//!
//! The service layer of the document verification lifecycle engine.
//! Composes the domain crates — `credence-state` (lifecycle machines),
//! `credence-entitlement` (quota gate), `credence-analyzer` (external
//! analysis capability) — behind an HTTP surface with capability-based
//! access control.
//!
//! ## API Surface
//!
//! | Prefix                  | Module                    | Domain                 |
//! |-------------------------|---------------------------|------------------------|
//! | `/v1/blobs`             | [`routes::documents`]     | Blob upload            |
//! | `/v1/documents/*`       | [`routes::documents`]     | Document management    |
//! | `/v1/verifications/*`   | [`routes::verifications`] | Verification lifecycle |
//! | `/v1/portfolio/*`       | [`routes::portfolio`]     | Public portfolio       |
//! | `/v1/admin/*`           | [`routes::admin`]         | Operator console       |
//! | `/health/*`             | (here)                    | Health probes          |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → RateLimitMiddleware → Handler
//! ```
//!
//! Health probes and the portfolio view are mounted outside the auth
//! middleware; everything else requires a resolved caller identity.

pub mod auth;
pub mod blob;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod reporter;
pub mod routes;
pub mod state;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::state::AppState;

pub use error::AppError;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(RateLimitConfig::default());

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::documents::router())
        .merge(routes::verifications::router())
        .merge(routes::admin::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(metrics))
        .layer(axum::Extension(limiter))
        .with_state(state.clone());

    // Unauthenticated surface: health probes and the public portfolio.
    let public = Router::new()
        .merge(routes::portfolio::router())
        .with_state(state);
    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(public).merge(api)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — returns 200 when the application can serve.
async fn readiness() -> &'static str {
    "ready"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::SecretToken;
    use crate::state::AppConfig;

    fn secured_state() -> AppState {
        let config = AppConfig {
            auth_token: Some(SecretToken::new("s3cret")),
            ..AppConfig::default()
        };
        AppState::with_parts(
            config,
            credence_analyzer::Analyzer::Mock(credence_analyzer::MockAnalyzer::new()),
        )
    }

    #[tokio::test]
    async fn health_probes_need_no_auth() {
        let app = app(secured_state());
        for path in ["/health/liveness", "/health/readiness"] {
            let resp = app
                .clone()
                .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{path}");
        }
    }

    #[tokio::test]
    async fn portfolio_needs_no_auth() {
        let app = app(secured_state());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/portfolio/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_routes_reject_missing_token() {
        let app = app(secured_state());
        let resp = app
            .oneshot(Request::builder().uri("/v1/documents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn api_routes_accept_valid_token() {
        let app = app(secured_state());
        let token = format!("job_seeker:{}:s3cret", Uuid::new_v4());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/v1/documents")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_routes_reject_bad_secret() {
        let app = app(secured_state());
        let token = format!("job_seeker:{}:wrong", Uuid::new_v4());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/v1/documents")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_request_records_login() {
        let state = secured_state();
        let app = app(state.clone());
        let user = Uuid::new_v4();
        let token = format!("employer:{user}:s3cret");

        app.oneshot(
            Request::builder()
                .uri("/v1/documents")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

        let record = state.users.get(&user).expect("user mirrored on login");
        assert!(record.last_login_at.is_some());
    }

    #[tokio::test]
    async fn openapi_spec_is_served() {
        let app = app(secured_state());
        let token = format!("job_seeker:{}:s3cret", Uuid::new_v4());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/openapi.json")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
