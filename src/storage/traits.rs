//! Raw row cursor trait definition

use async_trait::async_trait;

use crate::storage::error::StorageResult;

/// Native scan cursor of the storage engine
///
/// Yields encoded row values of one partition in storage order. The
/// executor builds its base result iterator on top of this.
#[async_trait]
pub trait RawRowCursor: Send {
    /// Get the next encoded row
    ///
    /// Returns `None` once the partition is exhausted.
    async fn next_raw(&mut self) -> StorageResult<Option<Vec<u8>>>;

    /// Release the cursor and any storage resources it pins
    ///
    /// Called at most once by the owning scan.
    fn release(&mut self);
}
