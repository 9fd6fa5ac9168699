//! Storage collaborator interface
//!
//! The storage engine itself lives elsewhere; the executor only consumes its
//! native scan cursor, one per partition.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryCursor;
pub use traits::RawRowCursor;
