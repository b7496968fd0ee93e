/// Errors from pack store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A path location that cannot be mapped inside the store.
    #[error("invalid path location {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
