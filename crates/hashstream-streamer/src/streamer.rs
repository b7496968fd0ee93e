use std::collections::HashSet;

use async_stream::try_stream;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tracing::debug;

use hashstream_crypto::{HashAlgorithm, StreamingHasher};
use hashstream_index::{FindOptions, IndexReader, IndexRecord, RecordStream};
use hashstream_pack::PackReader;
use hashstream_types::{Location, Multihash, VerifiableBlob};

use crate::batch::Batch;
use crate::config::{StreamOptions, StreamerConfig};
use crate::error::{StreamError, StreamResult};

/// Lazy sequence of blobs produced by [`HashStreamer::stream`].
pub type BlobStream<'a> = BoxStream<'a, StreamResult<VerifiableBlob>>;

/// One resolution level: the records still to classify and the pack reads
/// they have queued.
struct Frame<'a> {
    records: RecordStream<'a>,
    batch: Batch,
}

impl<'a> Frame<'a> {
    fn new(records: RecordStream<'a>) -> Self {
        Self {
            records,
            batch: Batch::default(),
        }
    }

    fn children(records: Vec<IndexRecord>) -> Self {
        Self::new(stream::iter(records.into_iter().map(Ok)).boxed())
    }
}

/// Resolves a multihash through the index and streams the bytes it names.
///
/// Nested packs and containing records are resolved depth-first. Each level
/// batches its byte ranges per pack and issues one read per pack once the
/// level is fully classified. A digest is yielded at most once per call.
#[derive(Clone, Debug)]
pub struct HashStreamer {
    index: IndexReader,
    packs: PackReader,
    config: StreamerConfig,
}

impl HashStreamer {
    pub fn new(index: IndexReader, packs: PackReader) -> Self {
        Self::with_config(index, packs, StreamerConfig::default())
    }

    pub fn with_config(index: IndexReader, packs: PackReader, config: StreamerConfig) -> Self {
        Self { index, packs, config }
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    /// Stream every blob reachable from `target`.
    ///
    /// Unknown targets produce an empty stream. With verification enabled a
    /// blob whose bytes do not hash to its label ends the stream with
    /// [`StreamError::DigestMismatch`].
    pub fn stream(&self, target: Multihash, options: StreamOptions) -> BlobStream<'_> {
        self.resolve(target, options, false)
    }

    /// Like [`stream`](Self::stream), but when `target` names a containing
    /// record the yielded bytes are hashed as they pass and compared with
    /// `target` at the end.
    ///
    /// Containing records written by a pack writer carry the digest of the
    /// whole input, so a mismatch means the output is not that input. The
    /// common cause is repeated content: an input made of identical blobs is
    /// streamed with each blob once. The mismatch is reported as
    /// [`StreamError::ContentMismatch`] after the last blob, so callers that
    /// write incrementally must treat what they wrote as incomplete.
    pub fn stream_content(&self, target: Multihash, options: StreamOptions) -> BlobStream<'_> {
        self.resolve(target, options, true)
    }

    fn resolve(&self, target: Multihash, options: StreamOptions, check_content: bool) -> BlobStream<'_> {
        Box::pin(try_stream! {
            let found = self.index.find_records(
                target,
                FindOptions {
                    containing: options.containing,
                },
            );
            let mut stack = vec![Frame::new(found)];
            let mut seen: HashSet<Multihash> = HashSet::new();
            let mut yielded = 0usize;
            let mut content: Option<StreamingHasher> = None;
            let mut bytes = 0u64;

            while let Some(frame) = stack.last_mut() {
                match frame.records.next().await {
                    Some(record) => match record? {
                        IndexRecord::Blob(blob) => {
                            if seen.insert(blob.multihash) {
                                let range = blob.range();
                                frame.batch.add_range(blob.location, range);
                            }
                        }
                        IndexRecord::Pack(pack) if pack.blobs.is_empty() => {
                            if seen.insert(pack.multihash) {
                                frame.batch.add_whole(Location::Digest(pack.multihash));
                            }
                        }
                        IndexRecord::Pack(pack) => {
                            let blobs = pack.blobs.into_iter().map(IndexRecord::Blob).collect();
                            stack.push(Frame::children(blobs));
                        }
                        IndexRecord::Containing(containing) => {
                            if check_content && stack.len() == 1 && containing.multihash == target {
                                content = Some(HashAlgorithm::from_code(target.code())?.streaming());
                            }
                            stack.push(Frame::children(containing.sub_records));
                        }
                    },
                    None => {
                        // Level exhausted: flush its reads before resuming the parent.
                        if let Some(done) = stack.pop() {
                            for (location, ranges) in done.batch.into_fetches() {
                                let mut blobs = self.packs.stream(location, ranges);
                                while let Some(blob) = blobs.next().await {
                                    let blob = blob?;
                                    self.check(&blob)?;
                                    if let Some(hasher) = content.as_mut() {
                                        hasher.update(&blob.bytes);
                                    }
                                    yielded += 1;
                                    bytes += blob.bytes.len() as u64;
                                    yield blob;
                                }
                            }
                        }
                    }
                }
            }

            debug!(
                multihash = %target.short_hex(),
                blobs = yielded,
                bytes,
                verified = self.config.verify,
                "stream complete"
            );

            if let Some(hasher) = content {
                let actual = hasher.finalize();
                if actual != target {
                    Err::<(), _>(StreamError::ContentMismatch {
                        expected: target,
                        actual,
                        bytes,
                    })?;
                }
            }
        })
    }

    fn check(&self, blob: &VerifiableBlob) -> StreamResult<()> {
        if !self.config.verify {
            return Ok(());
        }
        let actual = HashAlgorithm::from_code(blob.multihash.code())?.digest(&blob.bytes);
        if actual != blob.multihash {
            return Err(StreamError::DigestMismatch {
                expected: blob.multihash,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use bytes::Bytes;
    use futures::TryStreamExt;
    use hashstream_index::{BlobRecord, IndexStore, InMemoryIndexStore};
    use hashstream_pack::encode_car;
    use hashstream_store::{InMemoryPackStore, PackStore};

    struct Fixture {
        index: Arc<InMemoryIndexStore>,
        packs: Arc<InMemoryPackStore>,
        streamer: HashStreamer,
    }

    fn fixture(config: StreamerConfig) -> Fixture {
        let index = Arc::new(InMemoryIndexStore::new());
        let packs = Arc::new(InMemoryPackStore::new());
        let streamer = HashStreamer::with_config(
            IndexReader::new(index.clone()),
            PackReader::new(packs.clone()),
            config,
        );
        Fixture {
            index,
            packs,
            streamer,
        }
    }

    fn digest(data: &[u8]) -> Multihash {
        HashAlgorithm::Blake3.digest(data)
    }

    /// Store a car pack of `parts` and return its digest and blob records.
    async fn store_pack(fx: &Fixture, parts: &[&[u8]]) -> (Multihash, Vec<BlobRecord>) {
        let blobs: Vec<(Multihash, Bytes)> = parts
            .iter()
            .map(|p| (digest(p), Bytes::copy_from_slice(p)))
            .collect();
        let pack = encode_car(&blobs);
        let pack_digest = digest(&pack);
        fx.packs.put(&Location::Digest(pack_digest), pack.clone()).await.unwrap();

        let records = hashstream_pack::index_car(&pack)
            .unwrap()
            .into_iter()
            .map(|slot| BlobRecord {
                multihash: slot.multihash,
                location: Location::Digest(pack_digest),
                offset: slot.offset,
                length: slot.length,
            })
            .collect();
        (pack_digest, records)
    }

    async fn collect(fx: &Fixture, target: Multihash, options: StreamOptions) -> StreamResult<Vec<VerifiableBlob>> {
        fx.streamer.stream(target, options).try_collect().await
    }

    #[tokio::test]
    async fn containing_streams_packs_in_order() {
        let fx = fixture(StreamerConfig::default());
        let (p1, b1) = store_pack(&fx, &[b"one ", b"two "]).await;
        let (p2, b2) = store_pack(&fx, &[b"three ", b"four"]).await;
        let root = digest(b"one two three four");
        fx.index
            .add(
                vec![IndexRecord::from_containing(
                    root,
                    vec![IndexRecord::from_pack(p1, b1), IndexRecord::from_pack(p2, b2)],
                )],
                "test",
            )
            .await
            .unwrap();

        let blobs = collect(&fx, root, StreamOptions::default()).await.unwrap();
        let joined: Vec<u8> = blobs.iter().flat_map(|b| b.bytes.iter().copied()).collect();
        assert_eq!(joined, b"one two three four");
    }

    #[tokio::test]
    async fn duplicate_blobs_yielded_once() {
        let fx = fixture(StreamerConfig::default());
        let (p1, b1) = store_pack(&fx, &[b"shared", b"left"]).await;
        let (p2, b2) = store_pack(&fx, &[b"right", b"shared"]).await;
        let root = digest(b"root");
        fx.index
            .add(
                vec![IndexRecord::from_containing(
                    root,
                    vec![IndexRecord::from_pack(p1, b1), IndexRecord::from_pack(p2, b2)],
                )],
                "test",
            )
            .await
            .unwrap();

        let blobs = collect(&fx, root, StreamOptions::default()).await.unwrap();
        let labels: HashSet<Multihash> = blobs.iter().map(|b| b.multihash).collect();
        assert_eq!(blobs.len(), 3);
        assert_eq!(labels.len(), 3);
    }

    #[tokio::test]
    async fn content_check_accepts_complete_output() {
        let fx = fixture(StreamerConfig::default());
        let (p1, b1) = store_pack(&fx, &[b"one ", b"two"]).await;
        let root = digest(b"one two");
        fx.index
            .add(vec![IndexRecord::from_containing(root, vec![IndexRecord::from_pack(p1, b1)])], "test")
            .await
            .unwrap();

        let blobs: Vec<_> = fx
            .streamer
            .stream_content(root, StreamOptions::default())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(blobs.len(), 2);
    }

    #[tokio::test]
    async fn content_check_reports_collapsed_repeats() {
        let fx = fixture(StreamerConfig::default());
        let (p1, b1) = store_pack(&fx, &[b"same", b"same", b"same"]).await;
        let root = digest(b"samesamesame");
        fx.index
            .add(vec![IndexRecord::from_containing(root, vec![IndexRecord::from_pack(p1, b1)])], "test")
            .await
            .unwrap();

        let mut stream = fx.streamer.stream_content(root, StreamOptions::default());
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(&first.bytes[..], b"same");
        match stream.next().await {
            Some(Err(StreamError::ContentMismatch { expected, actual, bytes })) => {
                assert_eq!(expected, root);
                assert_eq!(actual, digest(b"same"));
                assert_eq!(bytes, 4);
            }
            other => panic!("expected content mismatch, got {other:?}"),
        }
        assert!(stream.next().await.is_none());

        // Plain streaming keeps at-most-once output without the check.
        assert_eq!(collect(&fx, root, StreamOptions::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn content_check_skips_non_containing_targets() {
        let fx = fixture(StreamerConfig::default());
        let (pack, blobs) = store_pack(&fx, &[b"dup", b"dup"]).await;
        fx.index
            .add(vec![IndexRecord::from_pack(pack, blobs)], "test")
            .await
            .unwrap();

        let streamed: Vec<_> = fx
            .streamer
            .stream_content(pack, StreamOptions::default())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(streamed.len(), 1);
    }

    #[tokio::test]
    async fn blob_within_containing_scope() {
        let fx = fixture(StreamerConfig::default());
        let (p1, b1) = store_pack(&fx, &[b"aa", b"bb", b"cc"]).await;
        let root = digest(b"root");
        fx.index
            .add(
                vec![IndexRecord::from_containing(root, vec![IndexRecord::from_pack(p1, b1)])],
                "test",
            )
            .await
            .unwrap();

        let blobs = collect(&fx, digest(b"bb"), StreamOptions::containing(root)).await.unwrap();
        assert_eq!(blobs, vec![VerifiableBlob::plain(digest(b"bb"), Bytes::from_static(b"bb"))]);

        let pack_blobs = collect(&fx, p1, StreamOptions::containing(root)).await.unwrap();
        assert_eq!(pack_blobs.len(), 3);

        assert!(collect(&fx, digest(b"bb"), StreamOptions::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn opaque_pack_fetched_whole() {
        let fx = fixture(StreamerConfig::default());
        let (pack, _) = store_pack(&fx, &[b"x", b"y"]).await;
        fx.index
            .add(vec![IndexRecord::from_pack(pack, Vec::new())], "test")
            .await
            .unwrap();

        let blobs = collect(&fx, pack, StreamOptions::default()).await.unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].multihash, pack);
        assert_eq!(blobs[0].bytes, fx.packs.get(&Location::Digest(pack)).await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn inline_blob_and_flat_pack_record_yield_once() {
        let fx = fixture(StreamerConfig::default());
        let data = Bytes::from_static(b"inline content");
        let mh = digest(&data);
        fx.packs.put(&Location::Digest(mh), data.clone()).await.unwrap();
        fx.index
            .add(
                vec![
                    IndexRecord::from_inline_blob(mh, data.len() as u64),
                    IndexRecord::from_pack(mh, Vec::new()),
                ],
                "test",
            )
            .await
            .unwrap();

        let blobs = collect(&fx, mh, StreamOptions::default()).await.unwrap();
        assert_eq!(blobs, vec![VerifiableBlob::plain(mh, data)]);
    }

    #[tokio::test]
    async fn unknown_target_is_empty() {
        let fx = fixture(StreamerConfig::default());
        let blobs = collect(&fx, digest(b"nothing here"), StreamOptions::default()).await.unwrap();
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn missing_pack_bytes_are_skipped() {
        let fx = fixture(StreamerConfig::default());
        let mh = digest(b"gone");
        fx.index
            .add(vec![IndexRecord::from_blob(mh, Location::Digest(digest(b"pack")), 0, 4)], "test")
            .await
            .unwrap();
        assert!(collect(&fx, mh, StreamOptions::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupted_pack_fails_verification() {
        let fx = fixture(StreamerConfig::default());
        let (pack, blobs) = store_pack(&fx, &[b"good", b"data"]).await;
        fx.index
            .add(vec![IndexRecord::from_pack(pack, blobs)], "test")
            .await
            .unwrap();

        let original = fx.packs.get(&Location::Digest(pack)).await.unwrap().unwrap();
        let mut tampered = original.to_vec();
        let last = tampered.len() - 1;
        tampered[last] ^= 0xff;
        fx.packs.replace(&Location::Digest(pack), Bytes::from(tampered));

        let err = collect(&fx, pack, StreamOptions::default()).await.unwrap_err();
        assert!(matches!(err, StreamError::DigestMismatch { expected, .. } if expected == digest(b"data")));
    }

    #[tokio::test]
    async fn verification_can_be_disabled() {
        let fx = fixture(StreamerConfig { verify: false });
        let (pack, blobs) = store_pack(&fx, &[b"good", b"data"]).await;
        fx.index
            .add(vec![IndexRecord::from_pack(pack, blobs)], "test")
            .await
            .unwrap();
        let mut tampered = fx.packs.get(&Location::Digest(pack)).await.unwrap().unwrap().to_vec();
        let last = tampered.len() - 1;
        tampered[last] ^= 0xff;
        fx.packs.replace(&Location::Digest(pack), Bytes::from(tampered));

        let blobs = collect(&fx, pack, StreamOptions::default()).await.unwrap();
        assert_eq!(blobs.len(), 2);
        assert_ne!(&blobs[1].bytes[..], b"data");
    }

    #[tokio::test]
    async fn prefix_consumption_stops_early() {
        let fx = fixture(StreamerConfig::default());
        let (p1, b1) = store_pack(&fx, &[b"first"]).await;
        let (p2, b2) = store_pack(&fx, &[b"second"]).await;
        let root = digest(b"root");
        fx.index
            .add(
                vec![IndexRecord::from_containing(
                    root,
                    vec![IndexRecord::from_pack(p1, b1), IndexRecord::from_pack(p2, b2)],
                )],
                "test",
            )
            .await
            .unwrap();
        // Reading the second pack would now fail verification.
        let mut tampered = fx.packs.get(&Location::Digest(p2)).await.unwrap().unwrap().to_vec();
        let last = tampered.len() - 1;
        tampered[last] ^= 0xff;
        fx.packs.replace(&Location::Digest(p2), Bytes::from(tampered));
        assert!(collect(&fx, root, StreamOptions::default()).await.is_err());

        let first: Vec<_> = fx
            .streamer
            .stream(root, StreamOptions::default())
            .take(1)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(&first[0].bytes[..], b"first");
    }
}
