//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout Credence.
//! Each identifier is a distinct type — you cannot pass a [`UserId`]
//! where a [`DocumentId`] is expected.
//!
//! UUID-based identifiers ([`UserId`], [`DocumentId`], [`RequestId`],
//! [`InstitutionId`]) are always valid by construction. [`FileReference`]
//! is a validated string handle into the external blob store; Credence
//! never dereferences it into bytes itself.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// A unique identifier for a registered user (job seeker, employer,
    /// or university principal).
    UserId
}

uuid_id! {
    /// A unique identifier for an uploaded credential document.
    DocumentId
}

uuid_id! {
    /// A unique identifier for one verification attempt against a document.
    RequestId
}

uuid_id! {
    /// A unique identifier for an issuing institution referenced by a
    /// document (university, certification body, licensing board).
    InstitutionId
}

// ---------------------------------------------------------------------------
// FileReference
// ---------------------------------------------------------------------------

/// Maximum length of a blob store reference.
const MAX_FILE_REFERENCE_LEN: usize = 512;

/// An opaque handle to document bytes held by the external blob store.
///
/// Serializes as a plain string. Validated on construction: non-empty
/// after trimming, at most 512 characters. The engine passes references
/// to the analyzer and blob store; it never inspects the bytes behind one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileReference(String);

impl FileReference {
    /// Create a validated file reference.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyFileReference);
        }
        if trimmed.len() > MAX_FILE_REFERENCE_LEN {
            return Err(ValidationError::FileReferenceTooLong {
                length: trimmed.len(),
                max: MAX_FILE_REFERENCE_LEN,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
