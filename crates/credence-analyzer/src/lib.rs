//! # credence-analyzer — Client for the External Analysis Capability
//!
//! Credence never inspects document bytes itself; it hands a file
//! reference to an external analyzer and receives a trust determination
//! back. This crate owns that contract:
//!
//! - [`AnalysisReport`] — the analyzer's output: determination,
//!   confidence in `0..=1`, extracted fields, explanation, tamper flag.
//! - [`AnalyzerError`] — failures classified `Transient` (worth one
//!   retry) or `Permanent` (fail immediately).
//! - [`HttpAnalyzer`] — the production implementation over HTTP.
//! - [`MockAnalyzer`] — a scriptable double used by the API layer's
//!   tests to drive verdicts, faults, and hangs deterministically.
//!
//! This crate is the only authorized path to the analyzer. The dispatcher
//! owns timeout enforcement and retry policy; clients here just classify.

pub mod http;
pub mod mock;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use credence_core::{Determination, FileReference};

pub use http::{HttpAnalyzer, HttpAnalyzerConfig};
pub use mock::{MockAnalyzer, MockOutcome};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// The analyzer's report for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// The trust determination.
    pub determination: Determination,
    /// Confidence in the determination, `0..=1`.
    pub confidence: f64,
    /// Fields the analyzer extracted from the document
    /// (issuer, holder name, award date, ...).
    #[serde(default)]
    pub extracted_fields: HashMap<String, String>,
    /// Human-readable explanation of the determination.
    #[serde(default)]
    pub explanation: String,
    /// The analyzer saw signs of tampering.
    #[serde(default)]
    pub tamper_suspected: bool,
}

impl AnalysisReport {
    /// Create a report with the given determination and confidence.
    pub fn new(determination: Determination, confidence: f64) -> Self {
        Self {
            determination,
            confidence,
            extracted_fields: HashMap::new(),
            explanation: String::new(),
            tamper_suspected: false,
        }
    }

    /// Attach an extracted field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extracted_fields.insert(key.into(), value.into());
        self
    }

    /// Attach an explanation.
    pub fn with_explanation(mut self, text: impl Into<String>) -> Self {
        self.explanation = text.into();
        self
    }

    /// Mark the report as carrying a tamper signal.
    pub fn with_tamper_signal(mut self) -> Self {
        self.tamper_suspected = true;
        self
    }

    /// Check the contract bounds on a deserialized report.
    ///
    /// A payload with confidence outside `0..=1` (or NaN) is malformed;
    /// callers treat that as a permanent analyzer error.
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(AnalyzerError::Permanent(format!(
                "confidence out of range: {}",
                self.confidence
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Failure of the external analysis capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    /// Transport-level or availability fault; one retry is reasonable.
    #[error("transient analyzer error: {0}")]
    Transient(String),

    /// Contract violation or rejection; retrying cannot help.
    #[error("permanent analyzer error: {0}")]
    Permanent(String),
}

impl AnalyzerError {
    /// Whether the dispatcher may retry after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

// ---------------------------------------------------------------------------
// Dispatchable client
// ---------------------------------------------------------------------------

/// The analyzer handle held by application state.
///
/// Concrete variants rather than trait objects, matching how the rest of
/// the platform holds external-capability clients; call sites stay
/// monomorphic and cloneable.
#[derive(Debug, Clone)]
pub enum Analyzer {
    /// Production HTTP analyzer.
    Http(HttpAnalyzer),
    /// Scriptable test double.
    Mock(MockAnalyzer),
}

impl Analyzer {
    /// Analyze the document behind `file`.
    pub async fn analyze(&self, file: &FileReference) -> Result<AnalysisReport, AnalyzerError> {
        match self {
            Self::Http(client) => client.analyze(file).await,
            Self::Mock(mock) => mock.analyze(file).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_builder_chains() {
        let report = AnalysisReport::new(Determination::Positive, 0.92)
            .with_field("issuer", "MIT")
            .with_field("award_date", "2019-06-01")
            .with_explanation("seal and transcript hash match issuer records");

        assert_eq!(report.extracted_fields.len(), 2);
        assert!(!report.tamper_suspected);
        report.validate().unwrap();
    }

    #[test]
    fn confidence_bounds_enforced() {
        assert!(AnalysisReport::new(Determination::Positive, 0.0).validate().is_ok());
        assert!(AnalysisReport::new(Determination::Positive, 1.0).validate().is_ok());
        assert!(AnalysisReport::new(Determination::Positive, 1.5).validate().is_err());
        assert!(AnalysisReport::new(Determination::Positive, -0.1).validate().is_err());
        assert!(AnalysisReport::new(Determination::Positive, f64::NAN).validate().is_err());
    }

    #[test]
    fn error_classification() {
        assert!(AnalyzerError::Transient("503".into()).is_transient());
        assert!(!AnalyzerError::Permanent("bad payload".into()).is_transient());
    }

    #[test]
    fn report_deserializes_with_sparse_payload() {
        // Optional fields default; only determination and confidence are required.
        let report: AnalysisReport =
            serde_json::from_str(r#"{"determination":"ambiguous","confidence":0.5}"#).unwrap();
        assert_eq!(report.determination, Determination::Ambiguous);
        assert!(report.extracted_fields.is_empty());
        assert!(report.explanation.is_empty());
        assert!(!report.tamper_suspected);
    }
}
