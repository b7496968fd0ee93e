use async_stream::try_stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use hashstream_types::{ByteRange, Location, Multihash};

use crate::error::StoreResult;

/// One item produced by [`PackStore::stream`].
///
/// `multihash` is the label the caller asked for: the range's digest, or
/// the target digest for a whole-pack read. It is `None` for a whole read of
/// a path target, which has no digest to report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    pub multihash: Option<Multihash>,
    pub bytes: Bytes,
}

/// Lazy sequence of stored entries.
pub type EntryStream<'a> = BoxStream<'a, StoreResult<StoredEntry>>;

/// Byte-container storage keyed by digest or path.
///
/// All implementations must satisfy these invariants:
/// - Writes are atomic per key; a reader sees either nothing or the full
///   container.
/// - Absent keys read as `Ok(None)`, never as an error.
/// - Labels are passed through, not verified. Verification is the caller's
///   job.
#[async_trait]
pub trait PackStore: Send + Sync {
    /// Store `bytes` under `target`, replacing nothing if already present.
    async fn put(&self, target: &Location, bytes: Bytes) -> StoreResult<()>;

    /// Fetch the full container, or `None` if absent.
    async fn get(&self, target: &Location) -> StoreResult<Option<Bytes>>;

    /// Stream the whole target (`ranges == None`) or the requested slices.
    ///
    /// The default implementation fetches the full container once and
    /// slices it. Backends able to read partial objects should override it.
    fn stream<'a>(
        &'a self,
        target: &'a Location,
        ranges: Option<&'a [ByteRange]>,
    ) -> EntryStream<'a> {
        Box::pin(try_stream! {
            if let Some(bytes) = self.get(target).await? {
                match ranges {
                    None => {
                        yield StoredEntry {
                            multihash: target.as_digest().copied(),
                            bytes,
                        };
                    }
                    Some(ranges) => {
                        for range in ranges {
                            if let Some(slice) = slice_range(&bytes, range) {
                                yield StoredEntry {
                                    multihash: Some(range.multihash),
                                    bytes: slice,
                                };
                            } else {
                                tracing::warn!(
                                    location = %target,
                                    offset = range.offset,
                                    length = range.length,
                                    size = bytes.len(),
                                    "range outside stored pack, skipping"
                                );
                            }
                        }
                    }
                }
            }
        })
    }
}

/// Zero-copy slice of `bytes` covering `range`, if it fits.
pub(crate) fn slice_range(bytes: &Bytes, range: &ByteRange) -> Option<Bytes> {
    let end = range.end()?;
    if end > bytes.len() as u64 {
        return None;
    }
    Some(bytes.slice(range.offset as usize..end as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashstream_types::BLAKE3_CODE;

    fn mh(byte: u8) -> Multihash {
        Multihash::wrap(BLAKE3_CODE, [byte; 32]).unwrap()
    }

    #[test]
    fn slice_within_bounds() {
        let bytes = Bytes::from_static(b"0123456789");
        let slice = slice_range(&bytes, &ByteRange::new(mh(1), 2, 3)).unwrap();
        assert_eq!(&slice[..], b"234");
    }

    #[test]
    fn slice_touching_end() {
        let bytes = Bytes::from_static(b"0123456789");
        let slice = slice_range(&bytes, &ByteRange::new(mh(1), 7, 3)).unwrap();
        assert_eq!(&slice[..], b"789");
    }

    #[test]
    fn slice_past_end_is_none() {
        let bytes = Bytes::from_static(b"0123456789");
        assert!(slice_range(&bytes, &ByteRange::new(mh(1), 8, 3)).is_none());
        assert!(slice_range(&bytes, &ByteRange::new(mh(1), u64::MAX, 2)).is_none());
    }
}
