use thiserror::Error;

use hashstream_crypto::HasherError;
use hashstream_index::IndexError;
use hashstream_pack::PackError;
use hashstream_types::Multihash;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("pack error: {0}")]
    Pack(#[from] PackError),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: Multihash, actual: Multihash },

    #[error("streamed content does not hash to {expected} (got {actual} over {bytes} bytes)")]
    ContentMismatch {
        expected: Multihash,
        actual: Multihash,
        bytes: u64,
    },

    #[error("cannot verify digest: {0}")]
    Hasher(#[from] HasherError),
}

pub type StreamResult<T> = Result<T, StreamError>;
