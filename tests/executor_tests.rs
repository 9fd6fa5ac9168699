//! Executor integration tests

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use roodb_query::catalog::DataType;
use roodb_query::executor::encoding::encode_row;
use roodb_query::executor::{
    collect_rows, ColumnProjector, ColumnRef, Datum, ExecutorError, ExecutorResult,
    ResultIterator, Row, Scanner, TableScan,
};
use roodb_query::planner::ExplainPlan;
use roodb_query::storage::MemoryCursor;

/// Counts rows pulled from the wrapped iterator
struct Counting<I> {
    input: I,
    pulled: Arc<AtomicU64>,
}

#[async_trait]
impl<I: ResultIterator> ResultIterator for Counting<I> {
    async fn next(&mut self) -> ExecutorResult<Option<Row>> {
        let row = self.input.next().await?;
        if row.is_some() {
            self.pulled.fetch_add(1, Ordering::SeqCst);
        }
        Ok(row)
    }

    fn close(&mut self) {
        self.input.close()
    }

    fn explain(&self, plan_steps: &mut Vec<String>) {
        self.input.explain(plan_steps)
    }
}

fn int_rows(n: i64) -> Vec<Vec<u8>> {
    (0..n)
        .map(|i| encode_row(&Row::new(vec![Datum::Int(i), Datum::String(format!("r{i}"))])))
        .collect()
}

fn projector() -> Arc<ColumnProjector> {
    Arc::new(ColumnProjector::new(vec![
        ColumnRef::new("id", 0, DataType::BigInt),
        ColumnRef::new("name", 1, DataType::Text),
    ]))
}

/// Scanner over a counted table scan of `n` rows
fn scanner(n: i64, max_rows: u64) -> (Scanner, Arc<AtomicU64>, Arc<AtomicUsize>) {
    let cursor = MemoryCursor::new(int_rows(n));
    let released = cursor.release_counter();
    let pulled = Arc::new(AtomicU64::new(0));
    let scan = Counting {
        input: TableScan::new("orders", 2, cursor),
        pulled: Arc::clone(&pulled),
    };
    let scanner = Scanner::with_max_rows(Box::new(scan), projector(), max_rows);
    (scanner, pulled, released)
}

#[tokio::test]
async fn test_row_cap_yields_min_of_cap_and_rows() {
    let n = 5;
    for cap in [0u64, 1, 3, 5, 10] {
        let (mut scanner, pulled, released) = scanner(n, cap);
        let rows = collect_rows(&mut scanner.iterator()).await.unwrap();

        let expected = if cap == 0 { n as u64 } else { cap.min(n as u64) };
        assert_eq!(rows.len() as u64, expected, "cap {cap}");
        assert_eq!(pulled.load(Ordering::SeqCst), expected, "cap {cap}");
        assert_eq!(released.load(Ordering::SeqCst), 1, "cap {cap}");
    }
}

#[tokio::test]
async fn test_capped_rows_are_prefix() {
    let (mut scanner, _, _) = scanner(10, 3);
    let rows = collect_rows(&mut scanner.iterator()).await.unwrap();
    let ids: Vec<i64> = rows
        .iter()
        .map(|r| r.get(0).unwrap().as_int().unwrap())
        .collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_projection_shapes_rows() {
    let (mut scanner, _, _) = scanner(2, 0);
    let projection = scanner.projection();
    assert_eq!(projection.column_names(), vec!["id", "name"]);

    let rows = collect_rows(&mut scanner.iterator()).await.unwrap();
    let shaped = projection.project(&rows[1]).unwrap();
    assert_eq!(
        shaped,
        Row::new(vec![Datum::Int(1), Datum::String("r1".to_string())])
    );
}

#[tokio::test]
async fn test_explain_interleaved_with_iteration() {
    let (mut plain, _, _) = scanner(6, 4);
    let expected = collect_rows(&mut plain.iterator()).await.unwrap();

    let (mut scanner, pulled, _) = scanner(6, 4);
    let plan = scanner.explain_plan();
    assert_eq!(plan, ExplainPlan::new(vec!["SCAN PARTITION 2 OVER orders".to_string()]));
    assert_eq!(pulled.load(Ordering::SeqCst), 0);

    let mut rows = Vec::new();
    {
        let mut iter = scanner.iterator();
        while let Some(row) = iter.next().await.unwrap() {
            assert_eq!(iter.explain_plan(), plan);
            rows.push(row);
        }
    }
    assert_eq!(scanner.explain_plan(), plan);
    assert_eq!(rows, expected);
}

#[tokio::test]
async fn test_end_of_stream_is_sticky() {
    let (mut scanner, pulled, _) = scanner(2, 0);
    let mut iter = scanner.iterator();
    assert!(iter.next().await.unwrap().is_some());
    assert!(iter.next().await.unwrap().is_some());
    for _ in 0..3 {
        assert!(iter.next().await.unwrap().is_none());
    }
    assert_eq!(pulled.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (mut scanner, _, released) = scanner(4, 0);
    {
        let mut iter = scanner.iterator();
        assert!(iter.next().await.unwrap().is_some());
        iter.close();
        iter.close();
    }
    scanner.close();
    assert_eq!(released.load(Ordering::SeqCst), 1);

    // Closed scans report end of stream
    assert!(scanner.iterator().next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_scan_error_carries_context_and_releases() {
    let cursor = MemoryCursor::new(int_rows(5)).fail_at(3);
    let released = cursor.release_counter();
    let mut scanner = Scanner::new(Box::new(TableScan::new("orders", 7, cursor)), projector());

    let err = collect_rows(&mut scanner.iterator()).await.unwrap_err();
    match &err {
        ExecutorError::Scan {
            table,
            partition,
            row,
            ..
        } => {
            assert_eq!(table, "orders");
            assert_eq!(*partition, 7);
            assert_eq!(*row, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("orders"));
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dropped_scan_releases_cursor() {
    let cursor = MemoryCursor::new(int_rows(3));
    let released = cursor.release_counter();
    {
        let mut scan = TableScan::new("orders", 0, cursor);
        assert!(scan.next().await.unwrap().is_some());
    }
    assert_eq!(released.load(Ordering::SeqCst), 1);
}
