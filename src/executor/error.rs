//! Executor error types

use thiserror::Error;

use crate::catalog::DataType;
use crate::storage::StorageError;

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Executor errors
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// Storage layer error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Failure while scanning one partition, with the row it happened at
    #[error("scan of {table} partition {partition} failed at row {row}: {source}")]
    Scan {
        table: String,
        partition: u32,
        row: u64,
        #[source]
        source: Box<ExecutorError>,
    },

    /// Type mismatch during evaluation
    #[error("type mismatch in {context}: expected {expected}, got {got}")]
    TypeMismatch {
        expected: DataType,
        got: DataType,
        context: String,
    },

    /// Column index out of bounds
    #[error("column index {index} out of bounds (row has {row_len} columns)")]
    ColumnIndexOutOfBounds { index: usize, row_len: usize },

    /// Aggregate function not in the registry
    #[error("unknown aggregate function: {0}")]
    UnknownFunction(String),

    /// Aggregate arguments rejected at compile time
    #[error("invalid arguments for {function}: {reason}")]
    InvalidArguments { function: String, reason: String },

    /// Encoding/decoding error
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Serialized aggregate state could not be merged
    #[error("malformed aggregate state: {0}")]
    AggregateState(String),

    /// Failure attributed to one partition during distributed aggregation
    #[error("partition {partition}: {source}")]
    Partition {
        partition: u32,
        #[source]
        source: Box<ExecutorError>,
    },

    /// Work stopped because another part of the query failed
    #[error("cancelled")]
    Cancelled,

    /// The same partition state was offered twice
    #[error("partition {0} merged more than once")]
    DuplicatePartition(u32),

    /// Internal executor error
    #[error("internal error: {0}")]
    Internal(String),
}

impl ExecutorError {
    /// Attach partition context to an error
    pub fn in_partition(self, partition: u32) -> Self {
        match self {
            // Scan errors already name their partition
            e @ ExecutorError::Scan { .. } => e,
            e @ ExecutorError::Partition { .. } => e,
            e => ExecutorError::Partition {
                partition,
                source: Box::new(e),
            },
        }
    }
}
