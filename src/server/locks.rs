//! Per-conversation request serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::ThreadId;

/// One async lock per thread id.
///
/// The map holds weak references; an entry lives only while some request
/// holds or awaits its lock, and dead entries are pruned on the next acquire.
#[derive(Clone, Default)]
pub struct ConversationLocks {
    inner: Arc<Mutex<HashMap<ThreadId, Weak<AsyncMutex<()>>>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `thread`. Released when the guard drops.
    pub async fn acquire(&self, thread: &ThreadId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, weak| weak.strong_count() > 0);
            match map.get(thread).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    map.insert(thread.clone(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Threads with a live lock.
    pub fn active(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.values().filter(|weak| weak.strong_count() > 0).count()
    }
}

impl std::fmt::Debug for ConversationLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationLocks")
            .field("active", &self.active())
            .finish()
    }
}
