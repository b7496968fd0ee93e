use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use hashstream_types::{Location, Multihash};

use crate::error::IndexResult;
use crate::record::IndexRecord;
use crate::store::IndexStore;
use crate::writer::{AddBlobsOptions, BlobStream, IndexWriter};

/// Flat index: one blob record per blob and one childless pack record per
/// distinct pack.
///
/// Every lookup is a single-key fetch. There is no containing scope; the
/// option is ignored.
pub struct SingleLevelIndexWriter {
    store: Arc<dyn IndexStore>,
}

impl SingleLevelIndexWriter {
    /// Record type tag attached to everything this writer persists.
    pub const RECORD_TYPE: &'static str = "index/single-level";

    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IndexWriter for SingleLevelIndexWriter {
    async fn add_blobs(&self, mut blobs: BlobStream<'_>, options: AddBlobsOptions) -> IndexResult<()> {
        if let Some(containing) = options.containing {
            debug!(containing = %containing.short_hex(), "single-level index ignores containing scope");
        }

        let mut seen = HashSet::new();
        let mut packs: Vec<Multihash> = Vec::new();
        let mut blob_count = 0usize;

        while let Some(blob) = blobs.next().await {
            if let Location::Digest(location) = &blob.location {
                if seen.insert(*location) {
                    packs.push(*location);
                }
            }
            self.store.add(vec![blob.to_record()], Self::RECORD_TYPE).await?;
            blob_count += 1;
        }

        let pack_count = packs.len();
        if !packs.is_empty() {
            let records = packs
                .into_iter()
                .map(|pack| IndexRecord::from_pack(pack, Vec::new()))
                .collect();
            self.store.add(records, Self::RECORD_TYPE).await?;
        }

        debug!(blobs = blob_count, packs = pack_count, "single-level index written");
        Ok(())
    }
}
