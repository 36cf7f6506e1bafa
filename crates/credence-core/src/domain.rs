//! # Domain Enumerations
//!
//! The closed enumerations shared across the workspace: what kind of
//! credential a document is, who may see it, and what the analyzer
//! concluded about it. Each has exactly one definition here and is
//! matched exhaustively by consumers.

use serde::{Deserialize, Serialize};

// ── Document kind ───────────────────────────────────────────────────────────

/// The kind of credential artifact a document represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Academic degree (bachelor's, master's, doctorate).
    Degree,
    /// Professional or vocational certificate.
    Certificate,
    /// Government- or board-issued license.
    License,
    /// Reference letter from an employer or academic supervisor.
    Reference,
    /// Portfolio work sample.
    WorkSample,
    /// Resume / CV.
    Resume,
    /// Academic transcript.
    Transcript,
    /// Government identity document.
    IdentityDocument,
    /// Anything that does not fit the above.
    Other,
}

impl DocumentKind {
    /// All document kinds, in declaration order.
    pub const ALL: [DocumentKind; 9] = [
        Self::Degree,
        Self::Certificate,
        Self::License,
        Self::Reference,
        Self::WorkSample,
        Self::Resume,
        Self::Transcript,
        Self::IdentityDocument,
        Self::Other,
    ];

    /// Return the wire-format string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Degree => "degree",
            Self::Certificate => "certificate",
            Self::License => "license",
            Self::Reference => "reference",
            Self::WorkSample => "work_sample",
            Self::Resume => "resume",
            Self::Transcript => "transcript",
            Self::IdentityDocument => "identity_document",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Privacy ─────────────────────────────────────────────────────────────────

/// Who may read a document besides its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privacy {
    /// Visible to the owner (and admins) only.
    Private,
    /// Additionally readable by principals the owner designates.
    Shared,
    /// Readable by anyone through the portfolio view, authenticated or not.
    Public,
}

impl Privacy {
    /// Return the wire-format string for this privacy level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Shared => "shared",
            Self::Public => "public",
        }
    }
}

impl std::fmt::Display for Privacy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Privacy {
    /// Documents are private until the owner widens visibility.
    fn default() -> Self {
        Self::Private
    }
}

// ── Determination ───────────────────────────────────────────────────────────

/// The analyzer's trust determination for a document.
///
/// This is the analyzer contract's output vocabulary; mapping a
/// determination (plus confidence and tamper signals) to a document
/// status lives in `credence-state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Determination {
    /// The document appears genuine.
    Positive,
    /// The document appears fraudulent or materially inconsistent.
    Negative,
    /// The analyzer could not reach a clear determination.
    Ambiguous,
}

impl Determination {
    /// Return the wire-format string for this determination.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Ambiguous => "ambiguous",
        }
    }
}

impl std::fmt::Display for Determination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
