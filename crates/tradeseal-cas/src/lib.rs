//! # tradeseal-cas — Content-Addressed Storage
//!
//! Stage credentials are stored under the SHA-256 digest of their bytes and
//! referenced from escrow instances by that address. Three stores implement
//! [`ContentStore`]:
//!
//! - [`MemoryStore`]: concurrent in-process map, used by tests and the CLI
//!   simulation.
//! - [`FsStore`]: one file per object under a root directory, digest
//!   re-verified on every read so on-disk corruption is detected.
//! - [`CachedStore`]: read-through cache in front of any other store.
//!   Cached reads return exactly the bytes an uncached read would.

pub mod cached;
pub mod error;
pub mod fs;
pub mod memory;
pub mod store;

pub use cached::{CacheStats, CachedStore};
pub use error::CasError;
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use store::ContentStore;
