//! Server-side distinct value counting
//!
//! Shared partial aggregator of every histogram-based function
//! (STDDEV_POP, STDDEV_SAMP, MEDIAN). Ships one entry per distinct value
//! instead of one per row.

use std::sync::Arc;

use bytes::Bytes;

use crate::executor::{Datum, ExecutorResult, Expression, Row};

use super::histogram::ValueHistogram;
use super::ServerAggregator;

/// Counts occurrences of each distinct value of its argument
#[derive(Debug)]
pub struct DistinctValueWithCountServerAggregator {
    arg: Arc<dyn Expression>,
    histogram: ValueHistogram,
}

impl DistinctValueWithCountServerAggregator {
    /// Create an aggregator over a numeric argument expression
    pub fn new(arg: Arc<dyn Expression>) -> ExecutorResult<Self> {
        let histogram = ValueHistogram::new(&arg.data_type())?;
        Ok(DistinctValueWithCountServerAggregator { arg, histogram })
    }

    /// Histogram accumulated so far
    pub fn histogram(&self) -> &ValueHistogram {
        &self.histogram
    }
}

impl ServerAggregator for DistinctValueWithCountServerAggregator {
    fn accumulate(&mut self, row: &Row) -> ExecutorResult<()> {
        let value = self.arg.evaluate(row)?;
        self.histogram.add(&value)
    }

    fn serialize_state(&self) -> Bytes {
        self.histogram.encode()
    }

    /// The histogram has no scalar value of its own
    fn final_result(&self) -> Datum {
        Datum::Null
    }
}
