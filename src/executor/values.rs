//! Values executor
//!
//! Yields rows that are already materialized, such as the output of a
//! coordinator-side aggregation.

use std::collections::VecDeque;

use async_trait::async_trait;

use super::error::ExecutorResult;
use super::row::Row;
use super::ResultIterator;

/// Iterator over an in-memory list of rows
pub struct ValuesIterator {
    rows: VecDeque<Row>,
    /// Plan steps describing how the rows were produced
    plan_steps: Vec<String>,
}

impl ValuesIterator {
    /// Create an iterator over `rows` with the given plan steps
    pub fn new(rows: Vec<Row>, plan_steps: Vec<String>) -> Self {
        ValuesIterator {
            rows: rows.into(),
            plan_steps,
        }
    }

    /// Rows not yet returned
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

#[async_trait]
impl ResultIterator for ValuesIterator {
    async fn next(&mut self) -> ExecutorResult<Option<Row>> {
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) {
        self.rows.clear();
    }

    fn explain(&self, plan_steps: &mut Vec<String>) {
        plan_steps.extend(self.plan_steps.iter().cloned());
    }
}
