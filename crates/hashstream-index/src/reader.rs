use std::sync::Arc;

use async_stream::try_stream;
use futures::StreamExt;
use tracing::trace;

use hashstream_types::Multihash;

use crate::record::{BlobRecord, IndexRecord};
use crate::store::{IndexStore, RecordStream};

/// Options for [`IndexReader::find_records`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Search inside this containing record before falling back to a
    /// direct lookup.
    pub containing: Option<Multihash>,
}

impl FindOptions {
    pub fn containing(multihash: Multihash) -> Self {
        Self {
            containing: Some(multihash),
        }
    }
}

/// Resolves "where is multihash X" against an [`IndexStore`].
#[derive(Clone)]
pub struct IndexReader {
    store: Arc<dyn IndexStore>,
}

impl IndexReader {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self { store }
    }

    /// Records describing `multihash`.
    ///
    /// With a containing hint, every record stored under the hint is
    /// searched depth-first (pre-order) for descendants whose multihash
    /// matches; all matches are yielded. If the hint produced nothing, or
    /// there was no hint, the records stored directly under `multihash` are
    /// yielded instead. Unknown digests yield an empty sequence.
    pub fn find_records(&self, multihash: Multihash, options: FindOptions) -> RecordStream<'_> {
        Box::pin(try_stream! {
            let mut found = false;

            if let Some(containing) = options.containing {
                let mut scoped = self.store.get(&containing);
                while let Some(root) = scoped.next().await {
                    let root = root?;
                    for matched in matching_descendants(&root, &multihash) {
                        found = true;
                        yield matched;
                    }
                }
                trace!(
                    multihash = %multihash.short_hex(),
                    containing = %containing.short_hex(),
                    found,
                    "containing scope searched"
                );
            }

            if !found {
                let mut direct = self.store.get(&multihash);
                while let Some(record) = direct.next().await {
                    yield record?;
                }
            }
        })
    }
}

impl std::fmt::Debug for IndexReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexReader").finish_non_exhaustive()
    }
}

enum Node<'a> {
    Record(&'a IndexRecord),
    Blob(&'a BlobRecord),
}

/// Pre-order search of `root`'s descendants (not `root` itself).
fn matching_descendants(root: &IndexRecord, target: &Multihash) -> Vec<IndexRecord> {
    let mut matches = Vec::new();
    let mut stack: Vec<Node<'_>> = Vec::new();
    push_children(&mut stack, root);

    while let Some(node) = stack.pop() {
        match node {
            Node::Blob(blob) => {
                if blob.multihash == *target {
                    matches.push(IndexRecord::Blob(blob.clone()));
                }
            }
            Node::Record(record) => {
                if record.multihash() == target {
                    matches.push(record.clone());
                }
                push_children(&mut stack, record);
            }
        }
    }
    matches
}

/// Push children in reverse so they pop in their stored order.
fn push_children<'a>(stack: &mut Vec<Node<'a>>, record: &'a IndexRecord) {
    match record {
        IndexRecord::Blob(_) => {}
        IndexRecord::Pack(pack) => stack.extend(pack.blobs.iter().rev().map(Node::Blob)),
        IndexRecord::Containing(containing) => {
            stack.extend(containing.sub_records.iter().rev().map(Node::Record))
        }
    }
}
