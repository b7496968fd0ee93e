//! In-memory index store for tests and embedding.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::stream;

use hashstream_types::Multihash;

use crate::codec::{JsonCodec, RecordCodec, WireEnvelope};
use crate::error::IndexResult;
use crate::record::IndexRecord;
use crate::store::{merge_into, IndexStore, RecordStream};

/// An in-memory implementation of [`IndexStore`].
///
/// Records are kept encoded, exactly as a remote store would hold them, so
/// every read and write goes through the configured [`RecordCodec`].
pub struct InMemoryIndexStore {
    entries: RwLock<HashMap<Multihash, Vec<Vec<u8>>>>,
    codec: Arc<dyn RecordCodec>,
}

impl InMemoryIndexStore {
    /// Create a new empty store using the JSON codec.
    pub fn new() -> Self {
        Self::with_codec(Arc::new(JsonCodec))
    }

    pub fn with_codec(codec: Arc<dyn RecordCodec>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            codec,
        }
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Number of records stored under `key`.
    pub fn record_count(&self, key: &Multihash) -> usize {
        self.entries
            .read()
            .expect("lock poisoned")
            .get(key)
            .map_or(0, Vec::len)
    }

    fn decode_all(&self, encoded: &[Vec<u8>]) -> IndexResult<Vec<(String, IndexRecord)>> {
        encoded
            .iter()
            .map(|bytes| self.codec.decode(bytes)?.into_record())
            .collect()
    }
}

impl Default for InMemoryIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    fn get<'a>(&'a self, key: &'a Multihash) -> RecordStream<'a> {
        let decoded = {
            let map = self.entries.read().expect("lock poisoned");
            map.get(key).map(|encoded| self.decode_all(encoded))
        };
        let records: Vec<IndexResult<IndexRecord>> = match decoded {
            None => Vec::new(),
            Some(Ok(entries)) => entries.into_iter().map(|(_, r)| Ok(r)).collect(),
            Some(Err(e)) => vec![Err(e)],
        };
        Box::pin(stream::iter(records))
    }

    async fn add(&self, records: Vec<IndexRecord>, record_type: &str) -> IndexResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        for record in records {
            let key = *record.multihash();
            let slot = map.entry(key).or_default();
            let mut entries = self.decode_all(slot)?;
            merge_into(&mut entries, record_type, record);
            *slot = entries
                .iter()
                .map(|(tag, r)| self.codec.encode(&WireEnvelope::new(tag, r)))
                .collect::<IndexResult<Vec<_>>>()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryIndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryIndexStore")
            .field("key_count", &self.key_count())
            .finish()
    }
}
