//! Current key id tracking
//!
//! Holds the key id most recently reported by the KMS. Writers swap in a new immutable
//! snapshot; readers never block and never see a partially written value.

use arc_swap::ArcSwap;
use std::sync::Arc;

/// Lock-free cell holding the last known key id
pub struct KeyIdTracker {
    current: ArcSwap<String>,
}

impl std::fmt::Debug for KeyIdTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("KeyIdTracker").field(&self.get()).finish()
    }
}

impl Default for KeyIdTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyIdTracker {
    /// Creates a tracker holding the empty string
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(String::new()),
        }
    }

    /// Last stored key id, empty if none
    pub fn get(&self) -> String {
        self.current.load().as_ref().clone()
    }

    /// Replaces the key id, returning the previous one
    pub fn store(&self, key_id: impl Into<String>) -> Arc<String> {
        self.current.swap(Arc::new(key_id.into()))
    }
}
