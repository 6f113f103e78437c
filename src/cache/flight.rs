use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-key exclusive section for async callers.
///
/// At most one [`Flight`] per key exists at a time; later callers for the same
/// key wait until it drops. Keys are forgotten once nobody holds or waits on
/// them, so the map only ever contains in-progress work.
pub struct SingleFlight<K> {
    slots: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for SingleFlight<K> {
    fn default() -> Self {
        Self { slots: Mutex::new(HashMap::new()) }
    }
}

impl<K: Eq + Hash> SingleFlight<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive use of `key`.
    pub async fn acquire(&self, key: K) -> Flight<'_, K> {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(key).or_default().clone()
        };
        let guard = slot.clone().lock_owned().await;
        Flight { owner: self, slot, guard: Some(guard) }
    }

    /// Number of keys currently held or waited on.
    pub fn in_flight(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Exclusive hold on one key of a [`SingleFlight`]; released on drop.
pub struct Flight<'a, K: Eq + Hash> {
    owner: &'a SingleFlight<K>,
    slot: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash> Drop for Flight<'_, K> {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.owner.slots.lock();
        // Clones are only taken under this lock. A slot referenced by the map
        // alone (plus `self.slot` for our own) has no holder or waiter left;
        // that also sweeps slots abandoned by cancelled waiters.
        slots.retain(|_, slot| {
            let idle = if Arc::ptr_eq(slot, &self.slot) { 2 } else { 1 };
            Arc::strong_count(slot) > idle
        });
    }
}
