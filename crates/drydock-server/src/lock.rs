use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use drydock_core::ServiceName;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = std::sync::Mutex<HashMap<ServiceName, Slot>>;

#[derive(Debug, Default)]
struct Slot {
    lock: Arc<Mutex<()>>,
    /// Holders plus waiters. The entry is removed when this reaches zero.
    users: usize,
}

/// One async mutex per service name.
///
/// Entries exist only while some request holds or waits for them, so the map
/// stays as small as the number of services being worked on right now.
#[derive(Debug, Default)]
pub struct ServiceLocks {
    locks: Arc<LockMap>,
}

impl ServiceLocks {
    /// Wait for exclusive access to `service`. Released when the guard drops.
    pub async fn acquire(&self, service: &ServiceName) -> ServiceGuard {
        let reservation = Reservation::new(&self.locks, service);
        let guard = Arc::clone(&reservation.lock).lock_owned().await;
        ServiceGuard {
            _guard: guard,
            _reservation: reservation,
        }
    }

    /// Number of services currently locked or waited on.
    pub fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one service.
#[derive(Debug)]
pub struct ServiceGuard {
    // Field order matters: the mutex is released before the entry is pruned.
    _guard: OwnedMutexGuard<()>,
    _reservation: Reservation,
}

/// Counts as a user of a map entry from creation until drop, including while
/// the owning future is still waiting for the mutex or gets cancelled.
#[derive(Debug)]
struct Reservation {
    locks: Arc<LockMap>,
    service: ServiceName,
    lock: Arc<Mutex<()>>,
}

impl Reservation {
    fn new(locks: &Arc<LockMap>, service: &ServiceName) -> Self {
        let lock = {
            let mut map = lock_map(locks);
            let slot = map.entry(service.clone()).or_default();
            slot.users += 1;
            Arc::clone(&slot.lock)
        };
        Self {
            locks: Arc::clone(locks),
            service: service.clone(),
            lock,
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        let mut map = lock_map(&self.locks);
        if let Some(slot) = map.get_mut(&self.service) {
            slot.users -= 1;
            if slot.users == 0 {
                map.remove(&self.service);
            }
        }
    }
}

// The map is only touched in short sections that cannot panic midway, so a
// poisoned lock still holds consistent data.
fn lock_map(locks: &LockMap) -> std::sync::MutexGuard<'_, HashMap<ServiceName, Slot>> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}
