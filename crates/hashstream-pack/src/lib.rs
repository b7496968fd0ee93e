//! Pack layer for Hashstream.
//!
//! Splits input into content-addressed packs, stores them, and reports
//! every blob's placement to the index while storage is still running.
//!
//! # Architecture
//!
//! - **Pack format** ([`PackFormat`]): `car` multi-blob containers with a
//!   layout indexer, or `raw` single-blob packs
//! - **Sharder**: fixed-size blobs grouped into packs, whole-input digest
//!   computed on the fly
//! - **PackWriter**: storage and indexing as two concurrent tasks joined by
//!   a bounded channel, with [`Fanout`] feeding any number of index writers
//! - **PackReader**: whole-pack and byte-range reads yielding
//!   [`VerifiableBlob`](hashstream_types::VerifiableBlob)s

pub mod config;
pub mod error;
pub mod fanout;
pub mod format;
pub mod reader;
pub mod sharder;
pub mod writer;

pub use config::{PackFormat, WriterConfig};
pub use error::{PackError, PackResult};
pub use fanout::Fanout;
pub use format::{encode_car, index_car, BlobSlot, PACK_MAGIC, PACK_VERSION};
pub use reader::{PackReader, VerifiableStream};
pub use sharder::{Shard, Sharder};
pub use writer::{PackWriter, WriteResult};
