use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::UserId;

type Slot = Arc<AsyncMutex<()>>;

/// Registry of per-account mutexes serializing mutations of the same balance.
///
/// A slot exists only while some caller holds or waits for the account, so the registry
/// is bounded by in-flight requests rather than by every id ever named.
#[derive(Default)]
pub struct AccountLocks {
    slots: Mutex<HashMap<UserId, Slot>>,
}

/// Exclusive hold on one or more accounts; released on drop.
pub struct AccountGuard<'a> {
    locks: &'a AccountLocks,
    held: Vec<(UserId, OwnedMutexGuard<()>)>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every given account. Ids are locked in ascending order and duplicates are
    /// locked once, so two callers locking the same pair can never deadlock.
    pub async fn acquire(&self, accounts: &[UserId]) -> AccountGuard<'_> {
        let mut ids = accounts.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guard = AccountGuard {
            locks: self,
            held: Vec::with_capacity(ids.len()),
        };
        for id in ids {
            let slot = self.slot(id);
            guard.held.push((id, slot.lock_owned().await));
        }
        guard
    }

    /// Number of accounts currently held or awaited.
    pub fn tracked_accounts(&self) -> usize {
        self.map().len()
    }

    fn slot(&self, id: UserId) -> Slot {
        Arc::clone(self.map().entry(id).or_default())
    }

    fn release(&self, id: UserId, held: OwnedMutexGuard<()>) {
        drop(held);
        let mut slots = self.map();
        // Clones are only taken under the map lock, so a count of one means no other
        // caller holds or waits for this slot.
        if slots.get(&id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            slots.remove(&id);
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<UserId, Slot>> {
        // The map holds no invariant a panicking holder could break.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for AccountGuard<'_> {
    fn drop(&mut self) {
        for (id, held) in self.held.drain(..) {
            self.locks.release(id, held);
        }
    }
}
