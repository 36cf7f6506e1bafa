//! # HTTP Analyzer Client
//!
//! Production implementation of the analyzer contract: POSTs the file
//! reference to the analysis service and classifies every failure mode
//! as transient or permanent for the dispatcher's retry policy.

use std::time::Duration;

use serde::Serialize;

use credence_core::FileReference;

use crate::{AnalysisReport, AnalyzerError};

/// Configuration for the HTTP analyzer client.
#[derive(Debug, Clone)]
pub struct HttpAnalyzerConfig {
    /// Base URL of the analysis service (no trailing slash).
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl HttpAnalyzerConfig {
    /// Configuration with the default 30-second request timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: 30,
        }
    }
}

/// Wire format of the analysis request.
#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    file_reference: &'a str,
}

/// HTTP client for the external analyzer.
#[derive(Debug, Clone)]
pub struct HttpAnalyzer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalyzer {
    /// Build a client from configuration.
    pub fn new(config: HttpAnalyzerConfig) -> Result<Self, AnalyzerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalyzerError::Permanent(format!("client init failed: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Analyze the document behind `file`.
    pub async fn analyze(&self, file: &FileReference) -> Result<AnalysisReport, AnalyzerError> {
        let url = format!("{}/v1/analyze", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&AnalyzeRequest {
                file_reference: file.as_str(),
            })
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &detail));
        }

        let report: AnalysisReport = response
            .json()
            .await
            .map_err(|e| AnalyzerError::Permanent(format!("malformed analyzer payload: {e}")))?;
        report.validate()?;
        Ok(report)
    }
}

/// Classify a reqwest transport error.
///
/// Timeouts and connection faults are transient; request construction
/// problems are permanent.
fn classify_transport_error(e: reqwest::Error) -> AnalyzerError {
    if e.is_timeout() || e.is_connect() {
        AnalyzerError::Transient(format!("analyzer unreachable: {e}"))
    } else if e.is_request() {
        AnalyzerError::Permanent(format!("analyzer request invalid: {e}"))
    } else {
        AnalyzerError::Transient(format!("analyzer transport error: {e}"))
    }
}

/// Classify a non-success HTTP status.
///
/// 5xx and 429 are availability problems worth one retry; any other 4xx
/// means the request itself is unacceptable.
fn classify_status(status: reqwest::StatusCode, detail: &str) -> AnalyzerError {
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        AnalyzerError::Transient(format!("analyzer returned {status}: {detail}"))
    } else {
        AnalyzerError::Permanent(format!("analyzer returned {status}: {detail}"))
    }
}
