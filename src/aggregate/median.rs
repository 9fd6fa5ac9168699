//! MEDIAN client aggregator

use bytes::Bytes;

use crate::catalog::DataType;
use crate::executor::{Datum, ExecutorResult};

use super::histogram::ValueHistogram;
use super::stats;
use super::ClientAggregator;

/// Continuous median over the merged histogram
///
/// With an even row count the two middle values are averaged.
#[derive(Debug, Clone)]
pub struct MedianAggregator {
    histogram: ValueHistogram,
}

impl MedianAggregator {
    pub fn new(value_type: &DataType) -> ExecutorResult<Self> {
        Ok(MedianAggregator {
            histogram: ValueHistogram::new(value_type)?,
        })
    }
}

impl ClientAggregator for MedianAggregator {
    fn merge_state(&mut self, state: &[u8]) -> ExecutorResult<()> {
        self.histogram.merge_encoded(state)
    }

    fn serialize_state(&self) -> Bytes {
        self.histogram.encode()
    }

    fn final_result(&self) -> Datum {
        let entries = self.histogram.numeric_entries();
        stats::percentile_cont(&entries, 0.5)
            .map(Datum::Float)
            .unwrap_or(Datum::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merged(values: &[&[f64]]) -> MedianAggregator {
        let mut agg = MedianAggregator::new(&DataType::Double).unwrap();
        for part in values {
            let mut h = ValueHistogram::new(&DataType::Double).unwrap();
            for v in *part {
                h.add(&Datum::Float(*v)).unwrap();
            }
            agg.merge_state(&h.encode()).unwrap();
        }
        agg
    }

    #[test]
    fn test_odd_count() {
        let agg = merged(&[&[9.0, 1.0], &[4.0]]);
        assert_eq!(agg.final_result(), Datum::Float(4.0));
    }

    #[test]
    fn test_even_count_interpolates() {
        let agg = merged(&[&[1.0, 2.0], &[3.0, 10.0]]);
        assert_eq!(agg.final_result(), Datum::Float(2.5));
    }

    #[test]
    fn test_duplicates_count_as_rows() {
        let agg = merged(&[&[1.0, 7.0, 7.0], &[7.0, 100.0]]);
        assert_eq!(agg.final_result(), Datum::Float(7.0));
    }

    #[test]
    fn test_empty_is_null() {
        assert_eq!(merged(&[]).final_result(), Datum::Null);
    }
}
