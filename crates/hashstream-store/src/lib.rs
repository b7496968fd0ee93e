//! Pack byte storage for Hashstream.
//!
//! A pack store is a key/value store of immutable byte containers. Keys are
//! [`Location`](hashstream_types::Location)s: either the multihash of the
//! container's full bytes or an opaque store-relative path.
//!
//! # Storage Backends
//!
//! All backends implement the [`PackStore`] trait:
//!
//! - [`InMemoryPackStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsPackStore`] -- one file per pack under a root directory, with
//!   seek-based range reads
//!
//! # Design Rules
//!
//! 1. Packs are immutable once written.
//! 2. A missing key is not an error: `get` returns `Ok(None)` and `stream`
//!    yields nothing.
//! 3. Ranges that fall outside the stored bytes are skipped, not failed.
//! 4. All other I/O errors are propagated unmodified, never retried here.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsPackStore;
pub use memory::InMemoryPackStore;
pub use traits::{EntryStream, PackStore, StoredEntry};
