//! # Blob Store Adapter
//!
//! In-memory stand-in for the external blob service. The engine never
//! manipulates document bytes beyond this boundary: `put` returns an
//! opaque [`FileReference`] and everything downstream (records, the
//! analyzer call) carries only the reference.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use credence_core::FileReference;

/// Thread-safe, cloneable blob store.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl BlobStore {
    /// Create an empty blob store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes, returning the reference to hand around.
    pub fn put(&self, bytes: Vec<u8>) -> FileReference {
        let key = format!("blobs/{}", Uuid::new_v4());
        // Key is generated above and always within bounds.
        let reference = FileReference::new(&key)
            .unwrap_or_else(|_| unreachable!("generated blob key is always valid"));
        self.data.write().insert(key, bytes);
        reference
    }

    /// Fetch the bytes behind a reference, if present.
    pub fn get(&self, reference: &FileReference) -> Option<Vec<u8>> {
        self.data.read().get(reference.as_str()).cloned()
    }

    /// Whether a reference resolves.
    pub fn exists(&self, reference: &FileReference) -> bool {
        self.data.read().contains_key(reference.as_str())
    }
}
