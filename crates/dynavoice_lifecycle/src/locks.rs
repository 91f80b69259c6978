//! Per-resource async mutual exclusion.
//!
//! One `tokio::sync::Mutex` per channel id, created on first use and dropped
//! again when the last holder or waiter goes away. Operations on different ids
//! never contend.

use dynavoice_core::ChannelId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::trace;

type LockMap = HashMap<ChannelId, Arc<tokio::sync::Mutex<()>>>;

/// Keyed async mutex.
///
/// # Example
///
/// ```
/// use dynavoice_core::ChannelId;
/// use dynavoice_lifecycle::ResourceLocks;
///
/// # #[tokio::main]
/// # async fn main() {
/// let locks = ResourceLocks::default();
/// {
///     let _guard = locks.lock(ChannelId(1)).await;
///     assert_eq!(locks.len(), 1);
/// }
/// assert!(locks.is_empty());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceLocks {
    map: Arc<Mutex<LockMap>>,
}

impl ResourceLocks {
    /// Wait for exclusive access to `id`.
    pub async fn lock(&self, id: ChannelId) -> ResourceGuard {
        let mutex = self.map.lock().entry(id).or_default().clone();
        let guard = mutex.lock_owned().await;
        trace!(%id, "Resource lock acquired");
        ResourceGuard {
            id,
            map: self.map.clone(),
            guard: Some(guard),
        }
    }

    /// Number of ids with a holder or waiter.
    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    /// Whether no id is locked or awaited.
    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }
}

/// Exclusive access to one resource id; released on drop.
#[derive(Debug)]
pub struct ResourceGuard {
    id: ChannelId,
    map: Arc<Mutex<LockMap>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ResourceGuard {
    /// Id the guard protects.
    pub fn id(&self) -> ChannelId {
        self.id
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        // Waiters clone the Arc under the map lock, so a count of one here
        // means nobody else holds or awaits this id.
        let mut map = self.map.lock();
        drop(self.guard.take());
        if map
            .get(&self.id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            map.remove(&self.id);
        }
        trace!(id = %self.id, "Resource lock released");
    }
}
