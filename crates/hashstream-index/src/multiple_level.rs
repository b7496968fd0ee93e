use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use hashstream_types::{Location, Multihash};

use crate::error::IndexResult;
use crate::record::{BlobRecord, IndexRecord};
use crate::store::IndexStore;
use crate::writer::{AddBlobsOptions, BlobStream, IndexWriter};

/// Hierarchical index: blobs grouped under their pack, optionally wrapped
/// in a single containing record.
///
/// With a containing multihash only the containing record is persisted, so
/// its blobs are reachable through the containing scope but not by a
/// direct lookup. Without one, each pack and inline blob is persisted under
/// its own key.
pub struct MultipleLevelIndexWriter {
    store: Arc<dyn IndexStore>,
}

impl MultipleLevelIndexWriter {
    /// Record type tag attached to everything this writer persists.
    pub const RECORD_TYPE: &'static str = "index/multiple-level";

    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self { store }
    }
}

/// Top-level records in first-seen order, with packs addressable by digest.
#[derive(Default)]
struct Grouping {
    records: Vec<IndexRecord>,
    packs: HashMap<Multihash, usize>,
}

impl Grouping {
    fn push(&mut self, blob: BlobRecord) {
        let pack = match &blob.location {
            Location::Digest(location) if !blob.is_inline() => *location,
            // Inline blobs and path-located blobs stand alone.
            _ => {
                self.records.push(IndexRecord::Blob(blob));
                return;
            }
        };
        let slot = *self.packs.entry(pack).or_insert_with(|| {
            self.records.push(IndexRecord::from_pack(pack, Vec::new()));
            self.records.len() - 1
        });
        if let IndexRecord::Pack(record) = &mut self.records[slot] {
            record.blobs.push(blob);
        }
    }
}

#[async_trait]
impl IndexWriter for MultipleLevelIndexWriter {
    async fn add_blobs(&self, mut blobs: BlobStream<'_>, options: AddBlobsOptions) -> IndexResult<()> {
        let mut grouping = Grouping::default();
        let mut blob_count = 0usize;
        while let Some(blob) = blobs.next().await {
            grouping.push(BlobRecord {
                multihash: blob.multihash,
                location: blob.location,
                offset: blob.offset,
                length: blob.length,
            });
            blob_count += 1;
        }

        if grouping.records.is_empty() {
            return Ok(());
        }

        let top_level = grouping.records.len();
        match options.containing {
            Some(containing) => {
                let record = IndexRecord::from_containing(containing, grouping.records);
                self.store.add(vec![record], Self::RECORD_TYPE).await?;
                debug!(
                    containing = %containing.short_hex(),
                    blobs = blob_count,
                    top_level,
                    "multiple-level index written under containing record"
                );
            }
            None => {
                self.store.add(grouping.records, Self::RECORD_TYPE).await?;
                debug!(blobs = blob_count, top_level, "multiple-level index written");
            }
        }
        Ok(())
    }
}
