//! TableScan executor
//!
//! Base iterator of a partition scan: pulls encoded rows from the storage
//! engine's native cursor and decodes them.

use async_trait::async_trait;

use crate::storage::RawRowCursor;

use super::encoding::decode_row;
use super::error::{ExecutorError, ExecutorResult};
use super::row::Row;
use super::ResultIterator;

/// Table scan executor over one partition
pub struct TableScan<C: RawRowCursor> {
    /// Table name
    table: String,
    /// Partition being scanned
    partition: u32,
    /// Storage cursor, None once released
    cursor: Option<C>,
    /// Rows decoded so far
    rows_read: u64,
    /// Whether the cursor reported end of data
    exhausted: bool,
}

impl<C: RawRowCursor> TableScan<C> {
    /// Create a new table scan
    pub fn new(table: impl Into<String>, partition: u32, cursor: C) -> Self {
        TableScan {
            table: table.into(),
            partition,
            cursor: Some(cursor),
            rows_read: 0,
            exhausted: false,
        }
    }

    /// Number of rows produced so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    fn scan_error(&self, source: ExecutorError) -> ExecutorError {
        ExecutorError::Scan {
            table: self.table.clone(),
            partition: self.partition,
            row: self.rows_read,
            source: Box::new(source),
        }
    }
}

#[async_trait]
impl<C: RawRowCursor> ResultIterator for TableScan<C> {
    async fn next(&mut self) -> ExecutorResult<Option<Row>> {
        if self.exhausted {
            return Ok(None);
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };

        let raw = match cursor.next_raw().await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.exhausted = true;
                return Ok(None);
            }
            Err(e) => return Err(self.scan_error(e.into())),
        };

        let row = decode_row(&raw).map_err(|e| self.scan_error(e))?;
        self.rows_read += 1;
        Ok(Some(row))
    }

    fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.release();
            self.exhausted = true;
            tracing::debug!(
                table = %self.table,
                partition = self.partition,
                rows = self.rows_read,
                "Table scan closed"
            );
        }
    }

    fn explain(&self, plan_steps: &mut Vec<String>) {
        plan_steps.push(format!(
            "SCAN PARTITION {} OVER {}",
            self.partition, self.table
        ));
    }
}

impl<C: RawRowCursor> Drop for TableScan<C> {
    fn drop(&mut self) {
        self.close();
    }
}
