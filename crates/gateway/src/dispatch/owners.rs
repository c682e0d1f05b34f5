//! Thread-ownership map.
//!
//! Remembers which instance "owns" a Slack thread so follow-ups route
//! without a prefix. Bounded LRU, in-memory only — losing it on restart
//! just means the next unaddressed message re-resolves through the
//! routing table. The sentinel `_ROUNDTABLE` marks threads where
//! unaddressed messages fan out instead.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

/// Sentinel owner for roundtable threads.
pub const ROUNDTABLE_OWNER: &str = "_ROUNDTABLE";

pub struct ThreadOwnerMap {
    inner: Mutex<LruCache<String, String>>,
}

impl ThreadOwnerMap {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("max(1) is non-zero");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn set(&self, conversation: &str, owner: &str) {
        self.inner
            .lock()
            .put(conversation.to_owned(), owner.to_owned());
    }

    pub fn get(&self, conversation: &str) -> Option<String> {
        self.inner.lock().get(conversation).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let map = ThreadOwnerMap::new(10);
        map.set("C1:1.0", "alpha");
        assert_eq!(map.get("C1:1.0").as_deref(), Some("alpha"));
        assert_eq!(map.get("C1:2.0"), None);
    }

    #[test]
    fn explicit_readdress_overwrites() {
        let map = ThreadOwnerMap::new(10);
        map.set("C1:1.0", "alpha");
        map.set("C1:1.0", "beta");
        assert_eq!(map.get("C1:1.0").as_deref(), Some("beta"));
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let map = ThreadOwnerMap::new(2);
        map.set("a", "alpha");
        map.set("b", "beta");
        // Touch "a" so "b" is the LRU entry.
        assert!(map.get("a").is_some());
        map.set("c", "alpha");
        assert!(map.get("b").is_none());
        assert!(map.get("a").is_some());
        assert!(map.get("c").is_some());
    }

    #[test]
    fn roundtable_sentinel_round_trips() {
        let map = ThreadOwnerMap::new(10);
        map.set("C1:1.0", ROUNDTABLE_OWNER);
        assert_eq!(map.get("C1:1.0").as_deref(), Some(ROUNDTABLE_OWNER));
    }
}
