use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::lock::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots = Mutex<HashMap<(u64, u64), Arc<AsyncMutex<()>>>>;

/// In-process mutual exclusion keyed by (user, leave type).
///
/// Held across the whole read-validate-write sequence of an operation so two requests for
/// the same balance cannot interleave inside this process. A key's slot lives only while
/// someone holds or waits for it.
#[derive(Default)]
pub struct UserLocks {
    slots: Slots,
}

/// Releases the key on drop and forgets its slot once nobody else references it.
pub struct UserLockGuard<'a> {
    slots: &'a Slots,
    key: (u64, u64),
    guard: Option<OwnedMutexGuard<()>>,
}

impl UserLocks {
    pub async fn acquire(&self, user_id: u64, leave_type_id: u64) -> UserLockGuard<'_> {
        let key = (user_id, leave_type_id);
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots
                .entry(key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        UserLockGuard {
            slots: &self.slots,
            key,
            guard: Some(slot.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for UserLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Slots are cloned under this lock; a count of one means only the map holds it.
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_same_key_is_exclusive() {
        let locks = UserLocks::default();
        let guard = locks.acquire(1, 2).await;

        let slot = locks.slots.lock().unwrap().get(&(1, 2)).cloned().unwrap();
        assert!(slot.try_lock().is_none());

        drop(guard);
        assert!(slot.try_lock().is_some());
    }

    #[actix_web::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = UserLocks::default();
        let _a = locks.acquire(1, 2).await;
        let _b = locks.acquire(1, 3).await;
        let _c = locks.acquire(2, 2).await;
        assert_eq!(locks.len(), 3);
    }

    #[actix_web::test]
    async fn test_released_slots_are_forgotten() {
        let locks = UserLocks::default();
        for user_id in 0..50 {
            let _guard = locks.acquire(user_id, 1).await;
        }
        assert_eq!(locks.len(), 0);

        let first = locks.acquire(1, 1).await;
        let waiter = locks.acquire(1, 1);
        futures::pin_mut!(waiter);
        assert!(futures::poll!(waiter.as_mut()).is_pending());

        // The queued waiter keeps the slot alive after the holder leaves.
        drop(first);
        assert_eq!(locks.len(), 1);
        let second = waiter.await;
        drop(second);
        assert_eq!(locks.len(), 0);
    }
}
