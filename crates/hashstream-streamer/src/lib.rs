//! Hash streamer for Hashstream.
//!
//! Given a multihash, [`HashStreamer`] asks the index where its bytes live,
//! resolves nested pack and containing records depth-first, batches byte
//! ranges per pack, and streams [`VerifiableBlob`](hashstream_types::VerifiableBlob)s
//! back from the pack store. Each digest is yielded at most once per call,
//! and by default every blob is checked against its digest before it is
//! yielded. [`HashStreamer::stream_content`] additionally checks the whole
//! output against a containing digest, which catches inputs whose repeated
//! blobs were collapsed.

mod batch;
pub mod config;
pub mod error;
pub mod streamer;

pub use config::{StreamOptions, StreamerConfig};
pub use error::{StreamError, StreamResult};
pub use streamer::{BlobStream, HashStreamer};
