use thiserror::Error;

use hashstream_types::TypeError;

/// Errors from index operations.
///
/// A multihash with no records is not an error; lookups simply yield
/// nothing.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A persisted record does not describe a valid record tree.
    #[error("malformed index record: {0}")]
    MalformedRecord(String),

    /// A persisted digest could not be parsed.
    #[error("invalid digest in index record: {0}")]
    InvalidDigest(#[from] TypeError),

    /// Encoding or decoding failed in the record codec.
    #[error("codec error: {0}")]
    Codec(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
