//! # credence-api — Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the
//! environment:
//!
//! - `PORT` — listen port (default 8080).
//! - `AUTH_TOKEN` — shared bearer secret; unset disables secret
//!   checking (development only).
//! - `ANALYZER_URL` — base URL of the analysis service; unset falls
//!   back to the mock analyzer (development only).
//! - `ANALYZER_TIMEOUT_SECS` — per-call analyzer bound (default 30).
//! - `CONFIDENCE_THRESHOLD` — verified threshold override.
//! - `BOOTSTRAP_ADMIN` — user id granted the admin flag at startup.

use credence_analyzer::{Analyzer, HttpAnalyzer, HttpAnalyzerConfig, MockAnalyzer};
use credence_api::auth::SecretToken;
use credence_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let analyzer_timeout_secs: u64 = std::env::var("ANALYZER_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);

    let mut config = AppConfig {
        port,
        auth_token: std::env::var("AUTH_TOKEN").ok().map(SecretToken::new),
        analyzer_timeout: std::time::Duration::from_secs(analyzer_timeout_secs),
        ..AppConfig::default()
    };
    if let Some(threshold) = std::env::var("CONFIDENCE_THRESHOLD")
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
    {
        config.verified_confidence_threshold = threshold;
    }
    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set; bearer secrets are not checked (development mode)");
    }

    let analyzer = match std::env::var("ANALYZER_URL") {
        Ok(url) => {
            tracing::info!(%url, "analyzer client configured");
            let http = HttpAnalyzer::new(HttpAnalyzerConfig {
                base_url: url,
                timeout_secs: analyzer_timeout_secs,
            })
            .map_err(|e| {
                tracing::error!("failed to create analyzer client: {e}");
                e
            })?;
            Analyzer::Http(http)
        }
        Err(_) => {
            tracing::warn!("ANALYZER_URL not set; using the mock analyzer (development mode)");
            Analyzer::Mock(MockAnalyzer::new())
        }
    };

    let state = AppState::with_parts(config, analyzer);

    if let Some(admin) = std::env::var("BOOTSTRAP_ADMIN")
        .ok()
        .and_then(|v| v.parse::<uuid::Uuid>().ok())
    {
        state.admins.grant(admin);
        tracing::info!(user_id = %admin, "bootstrap admin granted");
    }

    let app = credence_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Credence API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
