//! In-session duplicate suppression

use std::collections::HashSet;

use crate::models::CallId;

/// Default number of call ids remembered before the cache is reset
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Bounded set of call ids already acknowledged upstream
///
/// Only suppresses resubmission within a running service; it is not
/// persisted and not a durable dedup guarantee. When an insert would exceed
/// the capacity the whole set is cleared first.
#[derive(Debug)]
pub struct ProcessedIdCache {
    ids: HashSet<CallId>,
    capacity: usize,
}

impl ProcessedIdCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ids: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    pub fn contains(&self, id: &CallId) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&mut self, id: CallId) {
        if self.ids.contains(&id) {
            return;
        }
        if self.ids.len() >= self.capacity {
            self.ids.clear();
        }
        self.ids.insert(id);
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = CallId>) {
        for id in ids {
            self.insert(id);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

impl Default for ProcessedIdCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut cache = ProcessedIdCache::new(10);
        cache.insert(CallId::new("a"));
        cache.insert(CallId::new("a"));
        assert!(cache.contains(&CallId::new("a")));
        assert!(!cache.contains(&CallId::new("b")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cleared_when_capacity_exceeded() {
        let mut cache = ProcessedIdCache::new(3);
        cache.extend(["1", "2", "3"].map(CallId::from));
        assert_eq!(cache.len(), 3);

        cache.insert(CallId::new("4"));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&CallId::new("4")));
        assert!(!cache.contains(&CallId::new("1")));
    }

    #[test]
    fn test_reinserting_known_id_does_not_clear() {
        let mut cache = ProcessedIdCache::new(2);
        cache.extend(["1", "2"].map(CallId::from));
        cache.insert(CallId::new("2"));
        assert_eq!(cache.len(), 2);
    }
}
