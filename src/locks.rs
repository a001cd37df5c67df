//! Per-repository locking.
//!
//! Two webhook deliveries for the same repository arriving together would
//! otherwise race `git fetch` against `git clone` in the same bare
//! directory.  Syncs (and the pipeline work that reads the mirror
//! afterwards) serialize through a mutex keyed by repository full name;
//! different repositories proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct RepoLocks {
    // Entries are retained for the process lifetime; the map is bounded by
    // the number of distinct repositories seen.
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting until any other holder releases
    /// it.  The guard releases on drop.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut map = self
                .inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                map.entry(key.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        entry.lock_owned().await
    }
}
