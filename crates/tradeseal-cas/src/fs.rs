//! Filesystem store: `{root}/{digest_hex}.bin`.
//!
//! Writes use `create_new` so concurrent writers of the same object never
//! clobber each other; identical digest means identical content. Every read
//! recomputes the digest and refuses bytes that no longer match.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tradeseal_core::{sha256_bytes, ContentDigest};

use crate::error::CasError;
use crate::store::ContentStore;

#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, address: &ContentDigest) -> PathBuf {
        self.root.join(format!("{}.bin", address.to_hex()))
    }
}

impl ContentStore for FsStore {
    fn put(&self, bytes: &[u8]) -> Result<ContentDigest, CasError> {
        let address = sha256_bytes(bytes);
        fs::create_dir_all(&self.root)?;
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_for(&address))
        {
            Ok(mut f) => f.write_all(bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(%address, len = bytes.len(), "stored object");
        Ok(address)
    }

    fn get(&self, address: &ContentDigest) -> Result<Vec<u8>, CasError> {
        let bytes = match fs::read(self.path_for(address)) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CasError::NotFound(*address))
            }
            Err(e) => return Err(e.into()),
        };
        let actual = sha256_bytes(&bytes);
        if actual != *address {
            tracing::warn!(expected = %address, %actual, "stored object failed integrity check");
            return Err(CasError::Integrity {
                expected: *address,
                actual,
            });
        }
        Ok(bytes)
    }

    fn contains(&self, address: &ContentDigest) -> Result<bool, CasError> {
        Ok(self.path_for(address).is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().join("cas"));
        let addr = store.put(b"{\"stage\":0}").unwrap();
        assert!(store.path_for(&addr).is_file());
        assert_eq!(store.get(&addr).unwrap(), b"{\"stage\":0}");
        assert_eq!(store.put(b"{\"stage\":0}").unwrap(), addr);
    }

    #[test]
    fn tampered_file_detected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let addr = store.put(b"original").unwrap();
        fs::write(store.path_for(&addr), b"tampered").unwrap();
        let err = store.get(&addr).unwrap_err();
        assert!(matches!(err, CasError::Integrity { expected, .. } if expected == addr));
        assert!(err.to_string().contains("integrity violation"));
    }

    #[test]
    fn missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let addr = sha256_bytes(b"absent");
        assert!(matches!(store.get(&addr), Err(CasError::NotFound(_))));
        assert!(!store.contains(&addr).unwrap());
    }
}
