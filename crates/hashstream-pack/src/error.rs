use thiserror::Error;

use hashstream_index::IndexError;
use hashstream_store::StoreError;
use hashstream_types::TypeError;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid pack magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(u32),

    #[error("corrupt pack entry at offset {offset}: {reason}")]
    CorruptEntry { offset: u64, reason: String },

    #[error("unsupported pack format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid writer options: {0}")]
    InvalidOptions(String),

    #[error("pack store error: {0}")]
    Store(#[from] StoreError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("invalid digest: {0}")]
    Digest(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("write pipeline stopped before completion")]
    Cancelled,
}

pub type PackResult<T> = Result<T, PackError>;
