//! Per-key generation locks.
//!
//! At most one orchestrator run is in flight per `GenerationKey`; a second
//! caller for the same key waits until the first releases. Distinct keys
//! proceed fully concurrently. Release is tied to guard drop, so it happens
//! on every exit path including panics and cancellation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

use tidings_common::GenerationKey;

#[derive(Default)]
pub struct GenerationLocks {
    keys: StdMutex<HashMap<GenerationKey, Arc<Mutex<()>>>>,
}

impl GenerationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a key, waiting if another run holds it.
    pub async fn acquire(&self, key: GenerationKey) -> OwnedMutexGuard<()> {
        let entry = {
            let mut keys = self
                .keys
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Guards and waiters each hold a clone of the Arc, so a count of
            // one means nobody is using the entry. Pruning here keeps the
            // table bounded by in-flight keys.
            keys.retain(|_, lock| Arc::strong_count(lock) > 1);
            keys.entry(key).or_default().clone()
        };
        entry.lock_owned().await
    }
}
