//! The [`IndexWriter`] interface and its input type.

use async_trait::async_trait;
use futures::stream::BoxStream;

use hashstream_types::{Location, Multihash};

use crate::error::IndexResult;
use crate::record::IndexRecord;

/// Placement of one blob, as discovered while writing packs.
///
/// Write-time input only; writers turn these into [`IndexRecord`]s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobIndexRecord {
    pub multihash: Multihash,
    pub location: Location,
    pub offset: u64,
    pub length: u64,
}

impl BlobIndexRecord {
    pub fn new(multihash: Multihash, location: impl Into<Location>, offset: u64, length: u64) -> Self {
        Self {
            multihash,
            location: location.into(),
            offset,
            length,
        }
    }

    pub fn is_inline(&self) -> bool {
        self.location.as_digest() == Some(&self.multihash)
    }

    pub fn to_record(&self) -> IndexRecord {
        IndexRecord::from_blob(self.multihash, self.location.clone(), self.offset, self.length)
    }
}

/// Options for [`IndexWriter::add_blobs`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddBlobsOptions {
    /// Group everything added by this call under one containing record.
    pub containing: Option<Multihash>,
}

impl AddBlobsOptions {
    pub fn containing(multihash: Multihash) -> Self {
        Self {
            containing: Some(multihash),
        }
    }
}

/// Input stream of blob placements.
pub type BlobStream<'a> = BoxStream<'a, BlobIndexRecord>;

/// A strategy for turning blob placements into persisted index records.
#[async_trait]
pub trait IndexWriter: Send + Sync {
    /// Consume `blobs` and persist the records this strategy derives.
    async fn add_blobs(&self, blobs: BlobStream<'_>, options: AddBlobsOptions) -> IndexResult<()>;
}
