use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use hashstream_crypto::{HashAlgorithm, StreamingHasher};
use hashstream_types::Multihash;

use crate::config::{PackFormat, WriterConfig};
use crate::error::PackResult;

/// One encoded pack produced by the [`Sharder`].
#[derive(Clone, Debug)]
pub struct Shard {
    pub bytes: Bytes,
    pub blob_count: usize,
}

/// Splits a byte source into fixed-size blobs and groups them into packs.
///
/// The digest of the whole input is accumulated as bytes are read and is
/// available from [`Sharder::finish`] once the source is exhausted.
pub struct Sharder<R> {
    source: R,
    format: PackFormat,
    hash: HashAlgorithm,
    blob_size: usize,
    blobs_per_pack: usize,
    root: StreamingHasher,
    exhausted: bool,
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin> Sharder<R> {
    pub fn new(source: R, config: &WriterConfig) -> Self {
        Self {
            source,
            format: config.pack_format,
            hash: config.hash,
            blob_size: config.blob_size,
            blobs_per_pack: config.blobs_per_pack(),
            root: config.hash.streaming(),
            exhausted: false,
            bytes_read: 0,
        }
    }

    /// Next encoded pack, or `None` once the source is exhausted.
    pub async fn next_shard(&mut self) -> PackResult<Option<Shard>> {
        let mut blobs: Vec<(Multihash, Bytes)> = Vec::with_capacity(self.blobs_per_pack);
        while blobs.len() < self.blobs_per_pack {
            match self.next_blob().await? {
                Some(blob) => blobs.push(blob),
                None => break,
            }
        }
        if blobs.is_empty() {
            return Ok(None);
        }

        let bytes = self.format.encode(&blobs)?;
        trace!(blobs = blobs.len(), size = bytes.len(), "shard encoded");
        Ok(Some(Shard {
            bytes,
            blob_count: blobs.len(),
        }))
    }

    /// Total bytes consumed from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Digest of everything read from the source.
    pub fn finish(self) -> Multihash {
        self.root.finalize()
    }

    async fn next_blob(&mut self) -> PackResult<Option<(Multihash, Bytes)>> {
        if self.exhausted {
            return Ok(None);
        }
        let mut buf = vec![0u8; self.blob_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.source.read(&mut buf[filled..]).await?;
            if n == 0 {
                self.exhausted = true;
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        self.root.update(&buf);
        self.bytes_read += filled as u64;
        Ok(Some((self.hash.digest(&buf), Bytes::from(buf))))
    }
}
