//! Query executor - composable result iterators
//!
//! Every stage of a query is a [`ResultIterator`]: a pull-based cursor that
//! yields rows, releases its resources on `close()`, and describes itself
//! in an explain plan. Stages compose by ownership: a wrapper holds the
//! iterator it decorates and delegates to it.

pub mod datum;
pub mod encoding;
pub mod error;
pub mod limit;
pub mod project;
pub mod row;
pub mod scan;
pub mod scanner;
pub mod values;

use std::fmt;

pub use datum::Datum;
pub use error::{ExecutorError, ExecutorResult};
pub use limit::RowCapped;
pub use project::{ColumnProjector, ColumnRef};
pub use row::Row;
pub use scan::TableScan;
pub use scanner::{ScanIterator, Scanner, DEFAULT_ESTIMATED_SIZE};
pub use values::ValuesIterator;

use async_trait::async_trait;

use crate::catalog::DataType;

/// Pull-based row cursor
///
/// - `next()`: Return the next row, or None once exhausted. After the first
///   None every later call returns None as well.
/// - `close()`: Release resources. Idempotent and infallible.
/// - `explain()`: Append this stage's plan steps. Never touches iteration state.
///
/// A single consumer drives `next()`; the `&mut self` receiver rules out
/// concurrent calls on one iterator.
#[async_trait]
pub trait ResultIterator: Send {
    /// Get the next row, or None if exhausted
    async fn next(&mut self) -> ExecutorResult<Option<Row>>;

    /// Close the iterator and release resources
    fn close(&mut self);

    /// Append this iterator's plan steps, innermost stage first
    fn explain(&self, plan_steps: &mut Vec<String>);
}

#[async_trait]
impl<I: ResultIterator + ?Sized> ResultIterator for Box<I> {
    async fn next(&mut self) -> ExecutorResult<Option<Row>> {
        (**self).next().await
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn explain(&self, plan_steps: &mut Vec<String>) {
        (**self).explain(plan_steps)
    }
}

#[async_trait]
impl<I: ResultIterator + ?Sized> ResultIterator for &mut I {
    async fn next(&mut self) -> ExecutorResult<Option<Row>> {
        (**self).next().await
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn explain(&self, plan_steps: &mut Vec<String>) {
        (**self).explain(plan_steps)
    }
}

/// Maps a stored row to the shape the query returns
///
/// Produced by query compilation; applied by the result materialization
/// stage after rows leave the scanner.
pub trait RowProjector: Send + Sync + fmt::Debug {
    /// Shape one row
    fn project(&self, row: &Row) -> ExecutorResult<Row>;

    /// Output column names
    fn column_names(&self) -> Vec<String>;
}

/// Compiled scalar expression evaluated against a row
pub trait Expression: Send + Sync + fmt::Debug {
    /// Evaluate against a row
    fn evaluate(&self, row: &Row) -> ExecutorResult<Datum>;

    /// Declared result type
    fn data_type(&self) -> DataType;

    /// Text used in explain output
    fn display_name(&self) -> String;
}

/// Drain an iterator into a vector, closing it on every exit path
pub async fn collect_rows<I: ResultIterator + ?Sized>(iter: &mut I) -> ExecutorResult<Vec<Row>> {
    let mut rows = Vec::new();
    let result = loop {
        match iter.next().await {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => break Ok(rows),
            Err(e) => break Err(e),
        }
    };
    iter.close();
    result
}
