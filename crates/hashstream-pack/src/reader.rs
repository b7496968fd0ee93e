use std::sync::Arc;

use async_stream::try_stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::trace;

use hashstream_crypto::HashAlgorithm;
use hashstream_store::PackStore;
use hashstream_types::{ByteRange, Location, VerifiableBlob};

use crate::error::PackResult;

/// Lazy sequence of blobs read from a pack store.
pub type VerifiableStream<'a> = BoxStream<'a, PackResult<VerifiableBlob>>;

/// Reads whole packs or byte ranges of packs from a [`PackStore`].
#[derive(Clone)]
pub struct PackReader {
    store: Arc<dyn PackStore>,
    hash: HashAlgorithm,
}

impl PackReader {
    pub fn new(store: Arc<dyn PackStore>) -> Self {
        Self {
            store,
            hash: HashAlgorithm::default(),
        }
    }

    /// Algorithm used to label whole reads of path targets.
    pub fn with_hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = hash;
        self
    }

    /// Stream `target`, whole or as `ranges`.
    ///
    /// A whole read yields one blob labelled with the target digest; for a
    /// path target the label is computed from the fetched bytes. A ranged
    /// read yields one blob per range, labelled with the range's own
    /// multihash and not checked against the bytes. Missing targets and
    /// ranges past the end of the pack yield nothing.
    pub fn stream(&self, target: Location, ranges: Option<Vec<ByteRange>>) -> VerifiableStream<'_> {
        Box::pin(try_stream! {
            let mut entries = self.store.stream(&target, ranges.as_deref());
            let mut yielded = 0usize;
            while let Some(entry) = entries.next().await {
                let entry = entry?;
                let multihash = match entry.multihash {
                    Some(multihash) => multihash,
                    None => self.hash.digest(&entry.bytes),
                };
                yielded += 1;
                yield VerifiableBlob::plain(multihash, entry.bytes);
            }
            trace!(
                location = %target,
                ranges = ranges.as_ref().map_or(0, Vec::len),
                yielded,
                "pack read"
            );
        })
    }
}

impl std::fmt::Debug for PackReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackReader")
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}
