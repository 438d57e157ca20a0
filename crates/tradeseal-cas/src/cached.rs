//! Read-through cache in front of another [`ContentStore`].
//!
//! Content at an address never changes, so cached entries never go stale;
//! the only policy is capacity. When full, the oldest entry is evicted.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tradeseal_core::ContentDigest;

use crate::error::CasError;
use crate::store::ContentStore;

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<ContentDigest, Arc<[u8]>>,
    order: VecDeque<ContentDigest>,
}

#[derive(Debug)]
pub struct CachedStore<S> {
    inner: S,
    capacity: usize,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: ContentStore> CachedStore<S> {
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    /// A capacity of zero disables caching.
    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            state: Mutex::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.state.lock().entries.len(),
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }

    fn remember(&self, address: ContentDigest, bytes: Arc<[u8]>) {
        if self.capacity == 0 {
            return;
        }
        let mut state = self.state.lock();
        if state.entries.contains_key(&address) {
            return;
        }
        while state.entries.len() >= self.capacity {
            match state.order.pop_front() {
                Some(old) => {
                    state.entries.remove(&old);
                }
                None => break,
            }
        }
        state.entries.insert(address, bytes);
        state.order.push_back(address);
    }
}

impl<S: ContentStore> ContentStore for CachedStore<S> {
    fn put(&self, bytes: &[u8]) -> Result<ContentDigest, CasError> {
        let address = self.inner.put(bytes)?;
        self.remember(address, Arc::from(bytes));
        Ok(address)
    }

    fn get(&self, address: &ContentDigest) -> Result<Vec<u8>, CasError> {
        if let Some(bytes) = self.state.lock().entries.get(address).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%address, "cache hit");
            return Ok(bytes.to_vec());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let bytes = self.inner.get(address)?;
        self.remember(*address, Arc::from(bytes.as_slice()));
        Ok(bytes)
    }

    fn contains(&self, address: &ContentDigest) -> Result<bool, CasError> {
        if self.state.lock().entries.contains_key(address) {
            return Ok(true);
        }
        self.inner.contains(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use proptest::prelude::*;

    #[test]
    fn second_read_is_a_hit_with_identical_bytes() {
        let backing = Arc::new(MemoryStore::new());
        let addr = backing.put(b"purchase credential").unwrap();
        let cached = CachedStore::new(Arc::clone(&backing));

        let first = cached.get(&addr).unwrap();
        let second = cached.get(&addr).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, backing.get(&addr).unwrap());
        assert_eq!(
            cached.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cached = CachedStore::with_capacity(MemoryStore::new(), 2);
        let a = cached.put(b"a").unwrap();
        let _b = cached.put(b"b").unwrap();
        let _c = cached.put(b"c").unwrap();
        assert_eq!(cached.stats().entries, 2);
        // Evicted from cache but still served from the backing store.
        assert_eq!(cached.get(&a).unwrap(), b"a");
        assert_eq!(cached.stats().misses, 1);
    }

    #[test]
    fn zero_capacity_never_caches() {
        let cached = CachedStore::with_capacity(MemoryStore::new(), 0);
        let a = cached.put(b"x").unwrap();
        cached.get(&a).unwrap();
        cached.get(&a).unwrap();
        assert_eq!(cached.stats().hits, 0);
        assert_eq!(cached.stats().entries, 0);
    }

    #[test]
    fn not_found_propagates() {
        let cached = CachedStore::new(MemoryStore::new());
        let addr = tradeseal_core::sha256_bytes(b"nope");
        assert!(matches!(cached.get(&addr), Err(CasError::NotFound(_))));
    }

    proptest! {
        #[test]
        fn cached_equals_uncached(blobs in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 1..16)) {
            let backing = Arc::new(MemoryStore::new());
            let cached = CachedStore::with_capacity(Arc::clone(&backing), 4);
            let addrs: Vec<_> = blobs.iter().map(|b| backing.put(b).unwrap()).collect();
            for _ in 0..2 {
                for addr in &addrs {
                    prop_assert_eq!(cached.get(addr).unwrap(), backing.get(addr).unwrap());
                }
            }
        }
    }
}
