//! STDDEV_POP and STDDEV_SAMP client aggregators
//!
//! Both merge distinct-value histograms and compute the deviation in two
//! passes over the merged histogram (mean first, then squared deviations),
//! which stays accurate when the mean is large relative to the spread.

use bytes::Bytes;

use crate::catalog::DataType;
use crate::executor::{Datum, ExecutorResult};

use super::histogram::ValueHistogram;
use super::stats;
use super::ClientAggregator;

/// Population standard deviation, `sqrt(Σc·(v−μ)² / N)`
#[derive(Debug, Clone)]
pub struct StddevPopAggregator {
    histogram: ValueHistogram,
}

impl StddevPopAggregator {
    /// Create an aggregator for an argument of the given numeric type
    pub fn new(value_type: &DataType) -> ExecutorResult<Self> {
        Ok(StddevPopAggregator {
            histogram: ValueHistogram::new(value_type)?,
        })
    }

    /// Merged histogram
    pub fn histogram(&self) -> &ValueHistogram {
        &self.histogram
    }
}

impl ClientAggregator for StddevPopAggregator {
    fn merge_state(&mut self, state: &[u8]) -> ExecutorResult<()> {
        self.histogram.merge_encoded(state)
    }

    fn serialize_state(&self) -> Bytes {
        self.histogram.encode()
    }

    fn final_result(&self) -> Datum {
        let entries = self.histogram.numeric_entries();
        match stats::population_variance(&entries) {
            Some(variance) => Datum::Float(variance.sqrt()),
            None => Datum::Null,
        }
    }
}

/// Sample standard deviation, `sqrt(Σc·(v−μ)² / (N−1))`
///
/// NULL with fewer than two rows.
#[derive(Debug, Clone)]
pub struct StddevSampAggregator {
    histogram: ValueHistogram,
}

impl StddevSampAggregator {
    pub fn new(value_type: &DataType) -> ExecutorResult<Self> {
        Ok(StddevSampAggregator {
            histogram: ValueHistogram::new(value_type)?,
        })
    }
}

impl ClientAggregator for StddevSampAggregator {
    fn merge_state(&mut self, state: &[u8]) -> ExecutorResult<()> {
        self.histogram.merge_encoded(state)
    }

    fn serialize_state(&self) -> Bytes {
        self.histogram.encode()
    }

    fn final_result(&self) -> Datum {
        let entries = self.histogram.numeric_entries();
        match stats::sample_variance(&entries) {
            Some(variance) => Datum::Float(variance.sqrt()),
            None => Datum::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorError;

    fn payload(data_type: &DataType, values: &[Datum]) -> Bytes {
        let mut h = ValueHistogram::new(data_type).unwrap();
        for v in values {
            h.add(v).unwrap();
        }
        h.encode()
    }

    fn ints(values: &[i64]) -> Bytes {
        let datums: Vec<_> = values.iter().map(|v| Datum::Int(*v)).collect();
        payload(&DataType::Int, &datums)
    }

    #[test]
    fn test_stddev_pop_small() {
        // {1: 2, 3: 2}
        let mut agg = StddevPopAggregator::new(&DataType::Int).unwrap();
        agg.merge_state(&ints(&[1, 3])).unwrap();
        agg.merge_state(&ints(&[1, 3])).unwrap();
        assert_eq!(agg.histogram().total(), 4);
        assert_eq!(agg.final_result(), Datum::Float(1.0));
    }

    #[test]
    fn test_empty_is_null() {
        let agg = StddevPopAggregator::new(&DataType::Double).unwrap();
        assert_eq!(agg.final_result(), Datum::Null);

        let mut agg = StddevPopAggregator::new(&DataType::Int).unwrap();
        agg.merge_state(&ints(&[])).unwrap();
        assert_eq!(agg.final_result(), Datum::Null);
    }

    #[test]
    fn test_single_value() {
        let mut pop = StddevPopAggregator::new(&DataType::Int).unwrap();
        pop.merge_state(&ints(&[42])).unwrap();
        assert_eq!(pop.final_result(), Datum::Float(0.0));

        let mut samp = StddevSampAggregator::new(&DataType::Int).unwrap();
        samp.merge_state(&ints(&[42])).unwrap();
        assert_eq!(samp.final_result(), Datum::Null);
    }

    #[test]
    fn test_stddev_samp() {
        let mut agg = StddevSampAggregator::new(&DataType::Int).unwrap();
        agg.merge_state(&ints(&[2, 4, 4, 4])).unwrap();
        agg.merge_state(&ints(&[5, 5, 7, 9])).unwrap();
        // Σ(v−5)² = 32 over 7
        let expected = (32.0f64 / 7.0).sqrt();
        assert_eq!(agg.final_result(), Datum::Float(expected));
    }

    #[test]
    fn test_merge_order_independent() {
        let parts = [ints(&[1, 2, 2]), ints(&[2, 7]), ints(&[-3, 1, 100])];
        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        let mut results = Vec::new();
        for order in orders {
            let mut agg = StddevPopAggregator::new(&DataType::Int).unwrap();
            for i in order {
                agg.merge_state(&parts[i]).unwrap();
            }
            results.push((agg.histogram().clone(), agg.final_result()));
        }
        for r in &results[1..] {
            assert_eq!(r, &results[0]);
        }
    }

    #[test]
    fn test_forwarded_state_merges_like_partials() {
        let mut left = StddevPopAggregator::new(&DataType::Int).unwrap();
        left.merge_state(&ints(&[1, 5])).unwrap();
        let mut right = StddevPopAggregator::new(&DataType::Int).unwrap();
        right.merge_state(&ints(&[9])).unwrap();

        let mut top = StddevPopAggregator::new(&DataType::Int).unwrap();
        top.merge_state(&left.serialize_state()).unwrap();
        top.merge_state(&right.serialize_state()).unwrap();

        let mut flat = StddevPopAggregator::new(&DataType::Int).unwrap();
        flat.merge_state(&ints(&[1, 5, 9])).unwrap();
        assert_eq!(top.final_result(), flat.final_result());
    }

    #[test]
    fn test_rejects_other_value_type() {
        let mut agg = StddevPopAggregator::new(&DataType::Int).unwrap();
        let doubles = payload(&DataType::Double, &[Datum::Float(1.5)]);
        assert!(matches!(
            agg.merge_state(&doubles),
            Err(ExecutorError::AggregateState(_))
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        let mut agg = StddevPopAggregator::new(&DataType::Int).unwrap();
        assert!(agg.merge_state(&[2, 5, 1]).is_err());
        assert!(agg.merge_state(&[]).is_err());
        // Failed merges leave the state untouched
        assert_eq!(agg.final_result(), Datum::Null);
    }
}
