use std::hash::Hash;

use hashlink::LinkedHashMap;
use parking_lot::Mutex;

/// Tracks the frames that may be evicted and chooses which one goes next.
///
/// Implementations carry their own latch so the buffer pool can call them
/// while holding its own lock. A replacer never calls back into the pool.
pub trait Replacer<ID: Eq + Hash + Copy>: Send + Sync {
    /// Removes and returns the next frame to evict, if any.
    fn victim(&self) -> Option<ID>;
    /// Stops tracking `entry_id`. No-op if it is not tracked.
    fn pin(&self, entry_id: ID);
    /// Starts tracking `entry_id` as the most recently unpinned entry.
    /// No-op if it is already tracked.
    fn unpin(&self, entry_id: ID);
    fn size(&self) -> usize;
}

/// Least-recently-unpinned replacement.
///
/// Recency is taken from the unpin event, not from page accesses: an entry
/// that stays tracked keeps its position until it is pinned again.
pub struct LruReplacer<ID: Eq + Hash + Copy> {
    // Front holds the entry that has been unpinned the longest.
    node_store: Mutex<LinkedHashMap<ID, ()>>,
    replacer_size: usize,
}

impl<ID: Eq + Hash + Copy> LruReplacer<ID> {
    pub fn new(number_of_entries: usize) -> Self {
        LruReplacer {
            node_store: Mutex::new(LinkedHashMap::with_capacity(number_of_entries)),
            replacer_size: number_of_entries,
        }
    }

    pub fn capacity(&self) -> usize {
        self.replacer_size
    }
}

impl<ID: Eq + Hash + Copy + Send> Replacer<ID> for LruReplacer<ID> {
    fn victim(&self) -> Option<ID> {
        let mut node_store = self.node_store.lock();
        node_store.pop_front().map(|(entry_id, _)| entry_id)
    }

    fn pin(&self, entry_id: ID) {
        self.node_store.lock().remove(&entry_id);
    }

    fn unpin(&self, entry_id: ID) {
        let mut node_store = self.node_store.lock();
        if node_store.contains_key(&entry_id) {
            return;
        }
        node_store.insert(entry_id, ());
    }

    fn size(&self) -> usize {
        self.node_store.lock().len()
    }
}
