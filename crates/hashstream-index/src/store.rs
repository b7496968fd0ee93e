//! The [`IndexStore`] trait: key/value persistence for index records.

use async_trait::async_trait;
use futures::stream::BoxStream;

use hashstream_types::Multihash;

use crate::error::IndexResult;
use crate::record::IndexRecord;

/// Lazy sequence of index records.
pub type RecordStream<'a> = BoxStream<'a, IndexResult<IndexRecord>>;

/// Storage backend for index records, keyed by each record's own multihash.
///
/// Implementations must be thread-safe and provide atomic read/write per
/// key. Adding a record whose `(multihash, kind)` already exists merges the
/// two by concatenating children; concurrent writers to one key are
/// therefore unioned, not serialized.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// All records stored under `key`. Empty if the key is absent.
    fn get<'a>(&'a self, key: &'a Multihash) -> RecordStream<'a>;

    /// Persist `records`, each under its own multihash, tagged with
    /// `record_type`.
    async fn add(&self, records: Vec<IndexRecord>, record_type: &str) -> IndexResult<()>;
}

/// Merge `record` into the entries already stored under its key.
pub(crate) fn merge_into(
    entries: &mut Vec<(String, IndexRecord)>,
    record_type: &str,
    record: IndexRecord,
) {
    let key = record.merge_key();
    match entries.iter_mut().find(|(_, r)| r.merge_key() == key) {
        Some((_, existing)) => {
            // Keys match, so the merge cannot hand the record back.
            let _ = existing.merge(record);
        }
        None => entries.push((record_type.to_string(), record)),
    }
}
