//! # Scriptable Mock Analyzer
//!
//! A test double for the analyzer contract. Tests enqueue a script of
//! outcomes; each `analyze` call consumes the next entry. An empty
//! script yields a confident positive report, so happy-path tests need
//! no setup. The `Hang` outcome parks the call far beyond any dispatcher
//! timeout, which is how timeout handling is exercised.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use credence_core::{Determination, FileReference};

use crate::{AnalysisReport, AnalyzerError};

/// One scripted analyzer behavior.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Return this report.
    Report(AnalysisReport),
    /// Fail with this error.
    Error(AnalyzerError),
    /// Never answer (sleeps past any reasonable timeout).
    Hang,
}

/// Scriptable analyzer double.
///
/// Clones share the script and call counter, so the instance placed in
/// application state can be driven and observed from the test body.
#[derive(Debug, Clone, Default)]
pub struct MockAnalyzer {
    script: Arc<Mutex<VecDeque<MockOutcome>>>,
    calls: Arc<AtomicUsize>,
}

impl MockAnalyzer {
    /// A mock with an empty script (every call returns a confident
    /// positive report).
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an outcome for a future call.
    pub fn push(&self, outcome: MockOutcome) {
        self.script.lock().push_back(outcome);
    }

    /// Enqueue a report outcome.
    pub fn push_report(&self, report: AnalysisReport) {
        self.push(MockOutcome::Report(report));
    }

    /// Enqueue an error outcome.
    pub fn push_error(&self, error: AnalyzerError) {
        self.push(MockOutcome::Error(error));
    }

    /// Number of `analyze` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Analyze per the script.
    pub async fn analyze(&self, _file: &FileReference) -> Result<AnalysisReport, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            None => Ok(AnalysisReport::new(Determination::Positive, 0.95)
                .with_explanation("mock default verdict")),
            Some(MockOutcome::Report(report)) => Ok(report),
            Some(MockOutcome::Error(error)) => Err(error),
            Some(MockOutcome::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AnalyzerError::Transient("mock hang elapsed".into()))
            }
        }
    }
}
