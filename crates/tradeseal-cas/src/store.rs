use serde::Serialize;
use tradeseal_core::{sha256_digest, CanonicalBytes, ContentDigest};

use crate::error::CasError;

/// Narrow get/put interface to a content-addressed store.
pub trait ContentStore: Send + Sync {
    /// Store `bytes` and return their address. Storing identical bytes
    /// twice returns the same address and is not an error.
    fn put(&self, bytes: &[u8]) -> Result<ContentDigest, CasError>;

    /// Fetch the bytes stored at `address`.
    ///
    /// # Errors
    ///
    /// [`CasError::NotFound`] when nothing is stored there.
    fn get(&self, address: &ContentDigest) -> Result<Vec<u8>, CasError>;

    fn contains(&self, address: &ContentDigest) -> Result<bool, CasError>;

    /// Canonicalize a document and store its canonical bytes. The returned
    /// address equals `sha256_digest(&CanonicalBytes::new(doc)?)`.
    fn put_document(&self, doc: &impl Serialize) -> Result<ContentDigest, CasError>
    where
        Self: Sized,
    {
        let canonical = CanonicalBytes::new(doc)?;
        let address = self.put(canonical.as_bytes())?;
        debug_assert_eq!(address, sha256_digest(&canonical));
        Ok(address)
    }
}

impl<S: ContentStore + ?Sized> ContentStore for std::sync::Arc<S> {
    fn put(&self, bytes: &[u8]) -> Result<ContentDigest, CasError> {
        (**self).put(bytes)
    }

    fn get(&self, address: &ContentDigest) -> Result<Vec<u8>, CasError> {
        (**self).get(address)
    }

    fn contains(&self, address: &ContentDigest) -> Result<bool, CasError> {
        (**self).contains(address)
    }
}
