//! Filesystem index store: one JSON document per key.

use std::path::{Path, PathBuf};

use async_stream::try_stream;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use hashstream_types::Multihash;

use crate::codec::WireEnvelope;
use crate::error::{IndexError, IndexResult};
use crate::record::IndexRecord;
use crate::store::{merge_into, IndexStore, RecordStream};

/// Index store persisting `<root>/<hex multihash>.json` files.
///
/// Each file holds the JSON array of wire envelopes stored under that key.
/// Writers within one process are serialized by an internal lock; the file
/// itself is replaced atomically via rename.
#[derive(Debug)]
pub struct FsIndexStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FsIndexStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> IndexResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &Multihash) -> PathBuf {
        self.root.join(format!("{}.json", key.to_hex()))
    }

    async fn read_entries(&self, key: &Multihash) -> IndexResult<Vec<(String, IndexRecord)>> {
        let data = match tokio::fs::read(self.key_path(key)).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let envelopes: Vec<WireEnvelope> =
            serde_json::from_slice(&data).map_err(|e| IndexError::Codec(e.to_string()))?;
        envelopes.into_iter().map(WireEnvelope::into_record).collect()
    }

    async fn write_entries(
        &self,
        key: &Multihash,
        entries: &[(String, IndexRecord)],
    ) -> IndexResult<()> {
        let envelopes: Vec<WireEnvelope> = entries
            .iter()
            .map(|(tag, record)| WireEnvelope::new(tag, record))
            .collect();
        let data =
            serde_json::to_vec(&envelopes).map_err(|e| IndexError::Codec(e.to_string()))?;
        let path = self.key_path(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl IndexStore for FsIndexStore {
    fn get<'a>(&'a self, key: &'a Multihash) -> RecordStream<'a> {
        Box::pin(try_stream! {
            for (_, record) in self.read_entries(key).await? {
                yield record;
            }
        })
    }

    async fn add(&self, records: Vec<IndexRecord>, record_type: &str) -> IndexResult<()> {
        let _guard = self.write_lock.lock().await;
        for record in records {
            let key = *record.multihash();
            let mut entries = self.read_entries(&key).await?;
            merge_into(&mut entries, record_type, record);
            self.write_entries(&key, &entries).await?;
            debug!(key = %key.short_hex(), records = entries.len(), record_type, "index key written");
        }
        Ok(())
    }
}
