//! Row cap executor
//!
//! Truncates a result stream after a fixed number of rows (LIMIT).

use async_trait::async_trait;

use super::error::ExecutorResult;
use super::row::Row;
use super::ResultIterator;

/// Iterator yielding at most `max_rows` rows of its input
///
/// Once the cap is reached the input is not advanced again. Close and
/// explain go straight to the input.
pub struct RowCapped<I> {
    /// Input iterator
    input: I,
    /// Maximum rows to return
    max_rows: u64,
    /// Number of rows requested so far
    row_count: u64,
}

impl<I: ResultIterator> RowCapped<I> {
    /// Create a new row cap over `input`
    pub fn new(input: I, max_rows: u64) -> Self {
        RowCapped {
            input,
            max_rows,
            row_count: 0,
        }
    }

    /// Number of rows this cap has let through or requested
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Unwrap the input iterator
    pub fn into_inner(self) -> I {
        self.input
    }
}

#[async_trait]
impl<I: ResultIterator> ResultIterator for RowCapped<I> {
    async fn next(&mut self) -> ExecutorResult<Option<Row>> {
        if self.row_count >= self.max_rows {
            return Ok(None);
        }
        self.row_count += 1;
        self.input.next().await
    }

    fn close(&mut self) {
        self.input.close()
    }

    fn explain(&self, plan_steps: &mut Vec<String>) {
        self.input.explain(plan_steps)
    }
}
