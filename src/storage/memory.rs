//! In-memory raw row cursor
//!
//! Serves pre-encoded rows from a buffer. Used by the demo binary and by
//! tests that need to observe cursor release or inject read failures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::error::{StorageError, StorageResult};
use super::traits::RawRowCursor;

/// Cursor over a buffer of encoded rows
pub struct MemoryCursor {
    rows: VecDeque<Vec<u8>>,
    /// Rows handed out so far
    position: u64,
    /// Fail the read at this position instead of returning a row
    fail_at: Option<u64>,
    released: bool,
    /// Number of times `release` actually freed the cursor
    releases: Arc<AtomicUsize>,
}

impl MemoryCursor {
    /// Create a cursor over encoded rows
    pub fn new(rows: Vec<Vec<u8>>) -> Self {
        MemoryCursor {
            rows: rows.into(),
            position: 0,
            fail_at: None,
            released: false,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make the read at `position` fail with a corruption error
    pub fn fail_at(mut self, position: u64) -> Self {
        self.fail_at = Some(position);
        self
    }

    /// Shared counter of releases, readable after the cursor is moved away
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.releases)
    }
}

#[async_trait]
impl RawRowCursor for MemoryCursor {
    async fn next_raw(&mut self) -> StorageResult<Option<Vec<u8>>> {
        if self.released {
            return Err(StorageError::Released);
        }
        if self.fail_at == Some(self.position) {
            return Err(StorageError::Corrupted {
                offset: self.position,
                reason: "injected read failure".to_string(),
            });
        }
        let row = self.rows.pop_front();
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.rows.clear();
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}
