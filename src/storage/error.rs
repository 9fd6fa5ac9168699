//! Storage error types

use thiserror::Error;

/// Storage operation errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Standard IO error
    #[error("IO error: {0}")]
    StdIo(#[from] std::io::Error),

    /// Stored value failed an integrity check
    #[error("Corrupted row at offset {offset}: {reason}")]
    Corrupted { offset: u64, reason: String },

    /// Cursor used after release
    #[error("Cursor is released")]
    Released,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
