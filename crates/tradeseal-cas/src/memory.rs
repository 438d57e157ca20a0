use std::sync::Arc;

use dashmap::DashMap;
use tradeseal_core::{sha256_bytes, ContentDigest};

use crate::error::CasError;
use crate::store::ContentStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: DashMap<ContentDigest, Arc<[u8]>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ContentStore for MemoryStore {
    fn put(&self, bytes: &[u8]) -> Result<ContentDigest, CasError> {
        let address = sha256_bytes(bytes);
        self.objects
            .entry(address)
            .or_insert_with(|| Arc::from(bytes));
        Ok(address)
    }

    fn get(&self, address: &ContentDigest) -> Result<Vec<u8>, CasError> {
        self.objects
            .get(address)
            .map(|entry| entry.value().to_vec())
            .ok_or(CasError::NotFound(*address))
    }

    fn contains(&self, address: &ContentDigest) -> Result<bool, CasError> {
        Ok(self.objects.contains_key(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_and_idempotence() {
        let store = MemoryStore::new();
        let a = store.put(b"listing").unwrap();
        let b = store.put(b"listing").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&a).unwrap(), b"listing");
        assert!(store.contains(&a).unwrap());
    }

    #[test]
    fn missing_address_is_not_found() {
        let store = MemoryStore::new();
        let addr = sha256_bytes(b"never stored");
        assert!(matches!(store.get(&addr), Err(CasError::NotFound(a)) if a == addr));
        assert!(!store.contains(&addr).unwrap());
    }

    #[test]
    fn document_address_is_canonical() {
        let store = MemoryStore::new();
        let a = store
            .put_document(&serde_json::json!({"b": 1, "a": 2}))
            .unwrap();
        let b = store
            .put_document(&serde_json::json!({"a": 2, "b": 1}))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(store.get(&a).unwrap(), br#"{"a":2,"b":1}"#);
    }
}
