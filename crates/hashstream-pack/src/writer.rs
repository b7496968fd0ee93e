use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture, FutureExt, Shared};
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use hashstream_index::{AddBlobsOptions, BlobIndexRecord, BlobStream, IndexWriter};
use hashstream_store::PackStore;
use hashstream_types::{Location, Multihash};

use crate::config::WriterConfig;
use crate::error::{PackError, PackResult};
use crate::fanout::Fanout;
use crate::sharder::Sharder;

/// Outcome of [`PackWriter::write`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteResult {
    /// Digest of the complete input.
    pub containing: Multihash,
    /// Digest of every stored pack, in write order.
    pub packs: Vec<Multihash>,
}

/// Record counts from the indexing side of a write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct IndexingStats {
    records: usize,
    peak_retained: usize,
}

/// Resolves once the storage side has consumed the whole input.
type ContainingDigest = Shared<BoxFuture<'static, Option<Multihash>>>;

/// Shards input into packs, stores them, and feeds blob locations to any
/// number of index writers.
///
/// Storage and indexing run concurrently and are linked by a bounded
/// channel. With no index writers the records are drained and dropped.
/// When indexing under the containing digest, the indexing side buffers
/// every blob record until the last pack is stored; storage never waits on
/// it. Uncontained indexing forwards records as they arrive.
pub struct PackWriter {
    store: Arc<dyn PackStore>,
    index_writers: Vec<Arc<dyn IndexWriter>>,
    config: WriterConfig,
}

impl PackWriter {
    pub fn new(store: Arc<dyn PackStore>, config: WriterConfig) -> Self {
        Self {
            store,
            index_writers: Vec::new(),
            config,
        }
    }

    /// Attach an index writer. Every writer receives every blob record.
    pub fn with_index_writer(mut self, writer: Arc<dyn IndexWriter>) -> Self {
        self.index_writers.push(writer);
        self
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Store `source` as packs and index its blobs.
    ///
    /// Options are validated before anything is read or written. A failure
    /// on either side aborts both.
    pub async fn write<R>(&self, source: R) -> PackResult<WriteResult>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.config.validate()?;

        let sharder = Sharder::new(source, &self.config);
        let (record_tx, record_rx) = mpsc::channel(self.config.channel_capacity);
        let (root_tx, root_rx) = oneshot::channel();
        let containing: ContainingDigest = root_rx.map(Result::ok).boxed().shared();

        let (packs, indexed) = tokio::try_join!(
            self.store_packs(sharder, record_tx, root_tx),
            self.index_blobs(record_rx, containing.clone()),
        )?;
        let containing = containing.await.ok_or(PackError::Cancelled)?;

        info!(
            containing = %containing.short_hex(),
            packs = packs.len(),
            blobs = indexed.records,
            format = %self.config.pack_format,
            "write complete"
        );
        Ok(WriteResult { containing, packs })
    }

    async fn store_packs<R>(
        &self,
        mut sharder: Sharder<R>,
        records: mpsc::Sender<BlobIndexRecord>,
        root: oneshot::Sender<Multihash>,
    ) -> PackResult<Vec<Multihash>>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut packs = Vec::new();
        while let Some(shard) = sharder.next_shard().await? {
            let digest = self.config.hash.digest(&shard.bytes);
            let layout = self.config.pack_format.layout(&shard.bytes, digest)?;
            let size = shard.bytes.len();

            self.store.put(&Location::Digest(digest), shard.bytes).await?;
            debug!(pack = %digest.short_hex(), blobs = layout.len(), size, "pack stored");
            packs.push(digest);

            for slot in layout {
                let record = BlobIndexRecord::new(slot.multihash, digest, slot.offset, slot.length);
                records.send(record).await.map_err(|_| PackError::Cancelled)?;
            }
        }
        drop(records);

        let bytes_read = sharder.bytes_read();
        let containing = sharder.finish();
        debug!(containing = %containing.short_hex(), bytes = bytes_read, "input exhausted");
        // The receiver only disappears when write() itself was dropped.
        let _ = root.send(containing);
        Ok(packs)
    }

    async fn index_blobs(
        &self,
        mut records: mpsc::Receiver<BlobIndexRecord>,
        containing: ContainingDigest,
    ) -> PackResult<IndexingStats> {
        if self.index_writers.is_empty() {
            let mut drained = 0;
            while records.recv().await.is_some() {
                drained += 1;
            }
            return Ok(IndexingStats {
                records: drained,
                peak_retained: 0,
            });
        }

        let fanout = Fanout::new();
        // Subscribe before the first push so nothing is released early.
        let subscriptions: Vec<_> = self.index_writers.iter().map(|_| fanout.subscribe()).collect();

        let pump = async {
            while let Some(record) = records.recv().await {
                fanout.push(record);
            }
            fanout.close();
            Ok::<_, PackError>(())
        };

        tokio::try_join!(pump, self.feed(subscriptions, containing))?;

        let stats = IndexingStats {
            records: fanout.pushed(),
            peak_retained: fanout.peak_retained(),
        };
        debug!(
            writers = self.index_writers.len(),
            blobs = stats.records,
            peak_retained = stats.peak_retained,
            "blob records indexed"
        );
        Ok(stats)
    }

    /// Hand one subscription to each index writer. Under the containing
    /// digest this waits for storage to finish, so the fanout holds every
    /// record until then; otherwise records are released as the slowest
    /// writer consumes them.
    async fn feed(
        &self,
        subscriptions: Vec<BlobStream<'static>>,
        containing: ContainingDigest,
    ) -> PackResult<()> {
        let options = if self.config.index_containing {
            match containing.await {
                Some(digest) => AddBlobsOptions::containing(digest),
                None => return Ok(()),
            }
        } else {
            AddBlobsOptions::default()
        };
        try_join_all(
            self.index_writers
                .iter()
                .zip(subscriptions)
                .map(|(writer, blobs)| writer.add_blobs(blobs, options)),
        )
        .await?;
        Ok(())
    }
}

impl std::fmt::Debug for PackWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackWriter")
            .field("index_writers", &self.index_writers.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
