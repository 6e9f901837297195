//! Per-object serialization.
//!
//! Two inbound activities targeting the same object never interleave their
//! read-check-write sequences.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Idle entries are pruned once the map grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

/// Keyed async mutex.
#[derive(Clone, Default)]
pub struct ObjectLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ObjectLocks {
    /// Create an empty lock map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut map = self.inner.lock().await;
            if map.len() > PRUNE_THRESHOLD {
                map.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            map.entry(key.to_string()).or_default().clone()
        };
        entry.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether no keys are tracked.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
