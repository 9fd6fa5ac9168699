//! Scanner - composes a result iterator with projection, row cap and explain
//!
//! The scanner owns the iterator stack built for one query and hands out a
//! cursor over it. Without a row cap the cursor is the stack itself; with a
//! cap it is a [`RowCapped`] borrowing the stack.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ExecConfig;
use crate::planner::ExplainPlan;

pub use crate::config::DEFAULT_ESTIMATED_SIZE;

use super::error::ExecutorResult;
use super::limit::RowCapped;
use super::row::Row;
use super::{ResultIterator, RowProjector};

/// Wrapper making scans, joins and aggregations composable
pub struct Scanner {
    /// Wrapped iterator stack
    inner: Box<dyn ResultIterator>,
    /// Output shaping applied by result materialization
    projector: Arc<dyn RowProjector>,
    /// Row cap (0 = unlimited)
    max_rows: u64,
    // TODO: estimate from partition row statistics once storage reports them
    estimated_size: usize,
}

impl Scanner {
    /// Create an unlimited scanner
    pub fn new(inner: Box<dyn ResultIterator>, projector: Arc<dyn RowProjector>) -> Self {
        Self::with_max_rows(inner, projector, 0)
    }

    /// Create a scanner returning at most `max_rows` rows (0 = unlimited)
    pub fn with_max_rows(
        inner: Box<dyn ResultIterator>,
        projector: Arc<dyn RowProjector>,
        max_rows: u64,
    ) -> Self {
        Scanner {
            inner,
            projector,
            max_rows,
            estimated_size: DEFAULT_ESTIMATED_SIZE,
        }
    }

    /// Create a scanner using the row cap and size hint from `config`
    pub fn from_config(
        inner: Box<dyn ResultIterator>,
        projector: Arc<dyn RowProjector>,
        config: &ExecConfig,
    ) -> Self {
        let mut scanner = Self::with_max_rows(inner, projector, config.max_rows);
        scanner.estimated_size = config.estimated_size;
        scanner
    }

    /// Size hint for downstream buffers; not a bound
    pub fn estimated_size(&self) -> usize {
        self.estimated_size
    }

    /// Configured row cap (0 = unlimited)
    pub fn max_rows(&self) -> u64 {
        self.max_rows
    }

    /// Cursor over the scanner's rows
    ///
    /// Every call with a row cap starts a fresh count.
    pub fn iterator(&mut self) -> ScanIterator<'_> {
        if self.max_rows == 0 {
            return ScanIterator::Direct(&mut self.inner);
        }
        ScanIterator::RowCapped(RowCapped::new(&mut self.inner, self.max_rows))
    }

    /// Projector for result materialization
    pub fn projection(&self) -> Arc<dyn RowProjector> {
        Arc::clone(&self.projector)
    }

    /// Describe the wrapped iterator stack without advancing it
    pub fn explain_plan(&self) -> ExplainPlan {
        ExplainPlan::collect(&*self.inner)
    }

    /// Close the wrapped iterator stack
    pub fn close(&mut self) {
        self.inner.close();
    }
}

/// Cursor handed out by [`Scanner::iterator`]
pub enum ScanIterator<'a> {
    /// The wrapped stack itself, no row cap
    Direct(&'a mut Box<dyn ResultIterator>),
    /// The wrapped stack behind a row cap
    RowCapped(RowCapped<&'a mut Box<dyn ResultIterator>>),
}

impl ScanIterator<'_> {
    /// Describe the stack under this cursor
    pub fn explain_plan(&self) -> ExplainPlan {
        ExplainPlan::collect(self)
    }
}

#[async_trait]
impl ResultIterator for ScanIterator<'_> {
    async fn next(&mut self) -> ExecutorResult<Option<Row>> {
        match self {
            ScanIterator::Direct(inner) => inner.next().await,
            ScanIterator::RowCapped(capped) => capped.next().await,
        }
    }

    fn close(&mut self) {
        match self {
            ScanIterator::Direct(inner) => inner.close(),
            ScanIterator::RowCapped(capped) => capped.close(),
        }
    }

    fn explain(&self, plan_steps: &mut Vec<String>) {
        match self {
            ScanIterator::Direct(inner) => inner.explain(plan_steps),
            ScanIterator::RowCapped(capped) => capped.explain(plan_steps),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::catalog::DataType;
    use crate::executor::datum::Datum;
    use crate::executor::project::{ColumnProjector, ColumnRef};

    /// Yields 0..n and counts rows handed out through a shared counter
    struct CountingIterator {
        n: i64,
        next_value: i64,
        produced: Arc<AtomicUsize>,
        closed: bool,
    }

    #[async_trait]
    impl ResultIterator for CountingIterator {
        async fn next(&mut self) -> ExecutorResult<Option<Row>> {
            if self.closed || self.next_value >= self.n {
                return Ok(None);
            }
            let row = Row::new(vec![Datum::Int(self.next_value)]);
            self.next_value += 1;
            self.produced.fetch_add(1, Ordering::SeqCst);
            Ok(Some(row))
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn explain(&self, plan_steps: &mut Vec<String>) {
            plan_steps.push(format!("COUNTING 0..{}", self.n));
        }
    }

    fn scanner(n: i64, max_rows: u64) -> (Scanner, Arc<AtomicUsize>) {
        let produced = Arc::new(AtomicUsize::new(0));
        let inner = CountingIterator {
            n,
            next_value: 0,
            produced: Arc::clone(&produced),
            closed: false,
        };
        let projector = Arc::new(ColumnProjector::new(vec![ColumnRef::new(
            "v",
            0,
            DataType::BigInt,
        )]));
        (
            Scanner::with_max_rows(Box::new(inner), projector, max_rows),
            produced,
        )
    }

    async fn drain(iter: &mut ScanIterator<'_>) -> Vec<i64> {
        let mut out = Vec::new();
        while let Some(row) = iter.next().await.unwrap() {
            out.push(row.get(0).unwrap().as_int().unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_unlimited_is_passthrough() {
        let (mut scanner, produced) = scanner(4, 0);
        let mut iter = scanner.iterator();
        assert!(matches!(iter, ScanIterator::Direct(_)));
        assert_eq!(drain(&mut iter).await, vec![0, 1, 2, 3]);
        assert_eq!(produced.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_capped_stops_pulling() {
        let (mut scanner, produced) = scanner(10, 3);
        let mut iter = scanner.iterator();
        assert_eq!(drain(&mut iter).await, vec![0, 1, 2]);
        assert!(iter.next().await.unwrap().is_none());
        assert_eq!(produced.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_each_iterator_starts_a_fresh_count() {
        let (mut scanner, _) = scanner(10, 2);
        assert_eq!(drain(&mut scanner.iterator()).await, vec![0, 1]);
        // The inner stack continues where it stopped
        assert_eq!(drain(&mut scanner.iterator()).await, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_explain_plan_does_not_advance() {
        let (mut scanner, produced) = scanner(3, 0);
        let before = scanner.explain_plan();
        assert_eq!(before.steps(), &["COUNTING 0..3".to_string()]);
        assert_eq!(produced.load(Ordering::SeqCst), 0);

        let mut iter = scanner.iterator();
        assert!(iter.next().await.unwrap().is_some());
        assert_eq!(iter.explain_plan(), before);
        assert_eq!(drain(&mut iter).await, vec![1, 2]);

        assert_eq!(scanner.explain_plan(), before);
    }

    #[test]
    fn test_estimated_size_and_projection() {
        let (scanner, _) = scanner(1, 0);
        assert_eq!(scanner.estimated_size(), DEFAULT_ESTIMATED_SIZE);
        assert_eq!(scanner.projection().column_names(), vec!["v".to_string()]);
    }

    #[test]
    fn test_from_config() {
        let inner = CountingIterator {
            n: 1,
            next_value: 0,
            produced: Arc::new(AtomicUsize::new(0)),
            closed: false,
        };
        let config = ExecConfig::new().with_max_rows(7).with_estimated_size(512);
        let scanner = Scanner::from_config(
            Box::new(inner),
            Arc::new(ColumnProjector::identity(&["v"])),
            &config,
        );
        assert_eq!(scanner.max_rows(), 7);
        assert_eq!(scanner.estimated_size(), 512);
    }

    #[tokio::test]
    async fn test_close_through_iterator() {
        let (mut scanner, _) = scanner(5, 2);
        let mut iter = scanner.iterator();
        assert!(iter.next().await.unwrap().is_some());
        iter.close();
        iter.close();
        assert!(iter.next().await.unwrap().is_none());
        scanner.close();
    }
}
