use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::multihash::Multihash;

/// A byte slice within a pack, labelled with the digest it should hash to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
    pub multihash: Multihash,
}

impl ByteRange {
    pub fn new(multihash: Multihash, offset: u64, length: u64) -> Self {
        Self {
            offset,
            length,
            multihash,
        }
    }

    /// Exclusive end offset, or `None` on overflow.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }
}

/// Encoding of the bytes carried by a [`VerifiableBlob`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlobKind {
    /// The bytes hash directly to the label.
    Plain,
}

/// Bytes paired with the digest they are claimed to hash to.
///
/// Consumers must verify `bytes` against `multihash` before trusting them
/// unless the producer already did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiableBlob {
    pub multihash: Multihash,
    pub bytes: Bytes,
    pub kind: BlobKind,
}

impl VerifiableBlob {
    pub fn plain(multihash: Multihash, bytes: Bytes) -> Self {
        Self {
            multihash,
            bytes,
            kind: BlobKind::Plain,
        }
    }

    /// Number of bytes carried.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
