//! Location index for Hashstream.
//!
//! Maps a multihash to where its bytes live. Records form a shallow tree
//! (containing → pack → blob) persisted through an [`IndexStore`].
//!
//! # Architecture
//!
//! - **Record model** ([`IndexRecord`]): closed `Blob | Pack | Containing`
//!   union plus its wire form ([`WireRecord`]) and pluggable [`RecordCodec`]
//! - **Writers**: [`SingleLevelIndexWriter`] for flat O(1) lookups,
//!   [`MultipleLevelIndexWriter`] for pack- and containing-scoped trees
//! - **Reader** ([`IndexReader`]): scoped search with direct-key fallback
//! - **Stores**: [`InMemoryIndexStore`] and [`FsIndexStore`]

pub mod codec;
pub mod error;
pub mod fs;
pub mod memory;
pub mod multiple_level;
pub mod reader;
pub mod record;
pub mod single_level;
pub mod store;
pub mod writer;

pub use codec::{JsonCodec, RecordCodec, WireEnvelope, WireLocation, WireRecord};
pub use error::{IndexError, IndexResult};
pub use fs::FsIndexStore;
pub use memory::InMemoryIndexStore;
pub use multiple_level::MultipleLevelIndexWriter;
pub use reader::{FindOptions, IndexReader};
pub use record::{BlobRecord, ContainingRecord, IndexRecord, PackRecord, RecordKind};
pub use single_level::SingleLevelIndexWriter;
pub use store::{IndexStore, RecordStream};
pub use writer::{AddBlobsOptions, BlobIndexRecord, BlobStream, IndexWriter};
