use crate::domain::ids::ContactId;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;

pub type ContactGuard = ArcMutexGuard<RawMutex, ()>;

/// Keyed lock registry: at most one holder per contact id at a time.
///
/// Slot allocation is a read-modify-write over the call history, so callers
/// that share contacts across threads take the contact's guard around it.
#[derive(Debug, Default)]
pub struct ContactLocks {
    entries: Mutex<HashMap<ContactId, Arc<Mutex<()>>>>,
}

impl ContactLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self, id: ContactId) -> ContactGuard {
        let entry = {
            let mut entries = self.entries.lock();
            Arc::clone(entries.entry(id).or_default())
        };
        entry.lock_arc()
    }

    pub fn with_contact<T>(&self, id: ContactId, f: impl FnOnce() -> T) -> T {
        let _guard = self.lock(id);
        f()
    }

    /// Drops entries nobody holds or waits on.
    pub fn prune(&self) {
        self.entries
            .lock()
            .retain(|_, entry| Arc::strong_count(entry) > 1);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
