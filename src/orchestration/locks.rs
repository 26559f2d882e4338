//! Per-listing serialization of read-modify-write sequences.

use crate::domain::ListingId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

/// Idle lock entries are swept once the registry grows past this.
const PRUNE_THRESHOLD: usize = 1024;

/// Registry of per-listing async mutexes.
///
/// Every mutation of one auction (bid, settlement, relist, repair) holds that
/// listing's lock from the state read through the commit. Locks for different
/// listings are independent, so unrelated auctions never wait on each other.
#[derive(Debug, Default)]
pub struct ListingLocks {
    inner: Mutex<HashMap<ListingId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ListingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `wait` for the listing's lock. `None` means another writer
    /// held it for the whole budget.
    pub async fn acquire(
        &self,
        listing_id: ListingId,
        wait: Duration,
    ) -> Option<OwnedMutexGuard<()>> {
        let lock = self.lock_for(listing_id);
        tokio::time::timeout(wait, lock.lock_owned()).await.ok()
    }

    fn lock_for(&self, listing_id: ListingId) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap();
        if map.len() > PRUNE_THRESHOLD {
            // strong_count == 1 means only the registry still references the
            // lock: nobody holds or awaits it
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        map.entry(listing_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
