use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unsupported multihash code: {0:#x}")]
    UnsupportedCode(u64),

    #[error("malformed varint: {0}")]
    InvalidVarint(&'static str),
}
