//! Distinct-value histogram
//!
//! Maps each distinct non-null value of a numeric expression to the number
//! of rows that carried it. It is a sufficient statistic for the
//! deviation and percentile aggregates, and usually far smaller than the
//! rows it summarizes.
//!
//! Wire format:
//!
//! ```text
//! [value tag:u8][entry count:varint]{[value][count:varint]}*[total rows:varint]
//! ```
//!
//! Values use the row codec's numeric encodings (i64 LE, f64 LE, 16-byte
//! decimal) and appear in ascending order.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};

use crate::catalog::DataType;
use crate::executor::encoding::{
    get_numeric, numeric_tag, numeric_type_for_tag, put_numeric, put_varint, Decoder, TAG_DECIMAL,
};
use crate::executor::{Datum, ExecutorError, ExecutorResult};

/// Value → occurrence count for one aggregate argument
#[derive(Debug, Clone, PartialEq)]
pub struct ValueHistogram {
    /// Widened numeric type of the values
    value_type: DataType,
    /// Wire tag for `value_type`
    tag: u8,
    counts: HashMap<Datum, u64>,
    /// Sum of all counts
    total: u64,
}

impl ValueHistogram {
    /// Create an empty histogram for values of a numeric type
    pub fn new(value_type: &DataType) -> ExecutorResult<Self> {
        let (Some(widened), Some(tag)) = (value_type.widened(), numeric_tag(value_type)) else {
            return Err(ExecutorError::TypeMismatch {
                expected: DataType::Double,
                got: value_type.clone(),
                context: "value histogram".to_string(),
            });
        };
        Ok(ValueHistogram {
            value_type: widened,
            tag,
            counts: HashMap::new(),
            total: 0,
        })
    }

    /// Widened type of the values held
    pub fn value_type(&self) -> &DataType {
        &self.value_type
    }

    /// Count one occurrence of `value`; NULL is ignored
    pub fn add(&mut self, value: &Datum) -> ExecutorResult<()> {
        if value.is_null() {
            return Ok(());
        }
        let key = value
            .coerce_numeric(&self.value_type)
            .ok_or_else(|| ExecutorError::TypeMismatch {
                expected: self.value_type.clone(),
                got: value.data_type().unwrap_or(DataType::Text),
                context: "value histogram".to_string(),
            })?;
        self.add_count(key, 1)
    }

    /// Add `count` occurrences of an already canonical value
    fn add_count(&mut self, key: Datum, count: u64) -> ExecutorResult<()> {
        let total = self
            .total
            .checked_add(count)
            .ok_or_else(|| ExecutorError::AggregateState("row count overflow".to_string()))?;
        let slot = self.counts.entry(key).or_insert(0);
        *slot = slot
            .checked_add(count)
            .ok_or_else(|| ExecutorError::AggregateState("value count overflow".to_string()))?;
        self.total = total;
        Ok(())
    }

    /// Fold another histogram of the same value type into this one
    pub fn merge(&mut self, other: &ValueHistogram) -> ExecutorResult<()> {
        if other.value_type != self.value_type {
            return Err(ExecutorError::AggregateState(format!(
                "value type {} does not match expected {}",
                other.value_type, self.value_type
            )));
        }
        // No single count can overflow once the combined total fits
        if self.total.checked_add(other.total).is_none() {
            return Err(ExecutorError::AggregateState("row count overflow".to_string()));
        }
        for (value, count) in &other.counts {
            self.add_count(value.clone(), *count)?;
        }
        Ok(())
    }

    /// Decode a serialized histogram and fold it into this one
    pub fn merge_encoded(&mut self, state: &[u8]) -> ExecutorResult<()> {
        let partial = ValueHistogram::decode(state)?;
        self.merge(&partial)
    }

    /// Occurrences of `value`
    pub fn count_of(&self, value: &Datum) -> u64 {
        value
            .coerce_numeric(&self.value_type)
            .and_then(|key| self.counts.get(&key).copied())
            .unwrap_or(0)
    }

    /// Number of distinct values
    pub fn distinct_values(&self) -> usize {
        self.counts.len()
    }

    /// Number of non-null rows counted
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Entries in ascending value order
    pub fn entries(&self) -> Vec<(&Datum, u64)> {
        let mut entries: Vec<_> = self.counts.iter().map(|(v, c)| (v, *c)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Entries as floating point, ascending
    pub fn numeric_entries(&self) -> Vec<(f64, u64)> {
        self.entries()
            .into_iter()
            .filter_map(|(v, c)| v.as_float().map(|f| (f, c)))
            .collect()
    }

    /// Serialize to the wire format
    pub fn encode(&self) -> Bytes {
        let value_len = match self.tag {
            TAG_DECIMAL => 16,
            _ => 8,
        };
        let mut buf = BytesMut::with_capacity(1 + 10 + self.counts.len() * (value_len + 2) + 10);
        buf.put_u8(self.tag);
        put_varint(&mut buf, self.counts.len() as u64);
        for (value, count) in self.entries() {
            // Keys only enter through `add_count`, already coerced to `value_type`
            if let Err(e) = put_numeric(&mut buf, self.tag, value) {
                unreachable!("histogram key does not match its value type: {}", e);
            }
            put_varint(&mut buf, count);
        }
        put_varint(&mut buf, self.total);
        buf.freeze()
    }

    /// Deserialize from the wire format
    ///
    /// Rejects truncated input, unknown value tags, zero or duplicate
    /// entries, trailing bytes, and a total that disagrees with the counts.
    pub fn decode(data: &[u8]) -> ExecutorResult<Self> {
        Self::decode_inner(data).map_err(|e| match e {
            ExecutorError::Encoding(msg) => ExecutorError::AggregateState(msg),
            other => other,
        })
    }

    fn decode_inner(data: &[u8]) -> ExecutorResult<Self> {
        let mut decoder = Decoder::new(data);
        let tag = decoder.u8("histogram tag")?;
        let value_type = numeric_type_for_tag(tag).ok_or_else(|| {
            ExecutorError::AggregateState(format!("unknown histogram value tag: {}", tag))
        })?;
        let mut histogram = ValueHistogram::new(&value_type)?;

        let entries = decoder.varint("histogram entry count")?;
        // Each entry takes at least 9 bytes; don't trust the header for allocation
        let capacity = (entries as usize).min(decoder.remaining() / 9);
        histogram.counts.reserve(capacity);

        for _ in 0..entries {
            let raw = get_numeric(&mut decoder, tag)?;
            let count = decoder.varint("histogram count")?;
            if count == 0 {
                return Err(ExecutorError::AggregateState(format!(
                    "zero count for value {:?}",
                    raw
                )));
            }
            let key = raw.coerce_numeric(&value_type).ok_or_else(|| {
                ExecutorError::AggregateState(format!("bad histogram value {:?}", raw))
            })?;
            if histogram.counts.contains_key(&key) {
                return Err(ExecutorError::AggregateState(format!(
                    "duplicate histogram value {:?}",
                    key
                )));
            }
            histogram.add_count(key, count)?;
        }

        let declared_total = decoder.varint("histogram total")?;
        if declared_total != histogram.total {
            return Err(ExecutorError::AggregateState(format!(
                "histogram total {} does not match sum of counts {}",
                declared_total, histogram.total
            )));
        }
        if !decoder.is_empty() {
            return Err(ExecutorError::AggregateState(format!(
                "{} trailing bytes after histogram",
                decoder.remaining()
            )));
        }
        Ok(histogram)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;

    fn int_histogram(values: &[Option<i64>]) -> ValueHistogram {
        let mut h = ValueHistogram::new(&DataType::Int).unwrap();
        for v in values {
            let datum = v.map(Datum::Int).unwrap_or(Datum::Null);
            h.add(&datum).unwrap();
        }
        h
    }

    #[test]
    fn test_nulls_are_not_counted() {
        let h = int_histogram(&[Some(1), None, Some(3)]);
        assert_eq!(h.total(), 2);
        assert_eq!(h.distinct_values(), 2);
        assert_eq!(h.count_of(&Datum::Int(1)), 1);
        assert_eq!(h.count_of(&Datum::Null), 0);
    }

    #[test]
    fn test_counts_duplicates() {
        let h = int_histogram(&[Some(1), Some(1), Some(3), Some(3)]);
        assert_eq!(h.total(), 4);
        assert_eq!(h.numeric_entries(), vec![(1.0, 2), (3.0, 2)]);
    }

    #[test]
    fn test_round_trip() {
        let h = int_histogram(&[Some(5), Some(-2), Some(5), Some(900), None]);
        let decoded = ValueHistogram::decode(&h.encode()).unwrap();
        assert_eq!(decoded, h);
        assert_eq!(decoded.total(), 4);
    }

    #[test]
    fn test_round_trip_decimal() {
        let mut h = ValueHistogram::new(&DataType::Decimal).unwrap();
        h.add(&Datum::Decimal(Decimal::from_str("1.50").unwrap())).unwrap();
        h.add(&Datum::Decimal(Decimal::from_str("1.5").unwrap())).unwrap();
        h.add(&Datum::Int(2)).unwrap();
        assert_eq!(h.distinct_values(), 2);

        let decoded = ValueHistogram::decode(&h.encode()).unwrap();
        assert_eq!(decoded, h);
    }

    #[test]
    fn test_wire_layout() {
        let h = int_histogram(&[Some(3), Some(1), Some(3)]);
        let bytes = h.encode();

        let mut expected = vec![2u8, 2];
        expected.extend_from_slice(&1i64.to_le_bytes());
        expected.push(1);
        expected.extend_from_slice(&3i64.to_le_bytes());
        expected.push(2);
        expected.push(3);
        assert_eq!(&bytes[..], &expected[..]);
    }

    #[test]
    fn test_empty_round_trip() {
        let h = ValueHistogram::new(&DataType::Double).unwrap();
        let decoded = ValueHistogram::decode(&h.encode()).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.value_type(), &DataType::Double);
    }

    #[test]
    fn test_merge_sums_counts() {
        let mut a = int_histogram(&[Some(1), Some(2)]);
        let b = int_histogram(&[Some(2), Some(3)]);
        a.merge(&b).unwrap();
        assert_eq!(a.total(), 4);
        assert_eq!(a.count_of(&Datum::Int(2)), 2);
    }

    #[test]
    fn test_merge_overflow_leaves_histogram_unchanged() {
        let mut a = int_histogram(&[Some(1)]);
        a.add_count(Datum::Int(2), u64::MAX - 1).unwrap();
        let before = a.clone();

        let b = int_histogram(&[Some(1), Some(5)]);
        assert!(matches!(a.merge(&b), Err(ExecutorError::AggregateState(_))));
        assert_eq!(a, before);
    }

    #[test]
    fn test_encode_uses_widened_type() {
        let mut h = ValueHistogram::new(&DataType::Float).unwrap();
        h.add(&Datum::Int(2)).unwrap();
        h.add(&Datum::Float(0.5)).unwrap();

        let bytes = h.encode();
        assert_eq!(bytes[0], numeric_tag(&DataType::Double).unwrap());
        let decoded = ValueHistogram::decode(&bytes).unwrap();
        assert_eq!(decoded.numeric_entries(), vec![(0.5, 1), (2.0, 1)]);
    }

    #[test]
    fn test_merge_rejects_type_mismatch() {
        let mut a = int_histogram(&[Some(1)]);
        let b = ValueHistogram::new(&DataType::Double).unwrap();
        assert!(matches!(a.merge(&b), Err(ExecutorError::AggregateState(_))));
    }

    #[test]
    fn test_decode_rejects_truncation() {
        let bytes = int_histogram(&[Some(1), Some(2)]).encode();
        for len in 0..bytes.len() {
            assert!(
                matches!(
                    ValueHistogram::decode(&bytes[..len]),
                    Err(ExecutorError::AggregateState(_))
                ),
                "prefix of length {len} decoded"
            );
        }
    }

    #[test]
    fn test_decode_rejects_bad_total() {
        let mut bytes = int_histogram(&[Some(1), Some(2)]).encode().to_vec();
        let last = bytes.len() - 1;
        bytes[last] = 9;
        assert!(matches!(
            ValueHistogram::decode(&bytes),
            Err(ExecutorError::AggregateState(msg)) if msg.contains("does not match")
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = int_histogram(&[Some(1)]).encode().to_vec();
        bytes.push(0);
        assert!(ValueHistogram::decode(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_tag() {
        assert!(matches!(
            ValueHistogram::decode(&[4, 0, 0]),
            Err(ExecutorError::AggregateState(msg)) if msg.contains("unknown")
        ));
    }

    #[test]
    fn test_decode_rejects_duplicates() {
        let mut bytes = vec![2u8, 2];
        bytes.extend_from_slice(&7i64.to_le_bytes());
        bytes.push(1);
        bytes.extend_from_slice(&7i64.to_le_bytes());
        bytes.push(1);
        bytes.push(2);
        assert!(matches!(
            ValueHistogram::decode(&bytes),
            Err(ExecutorError::AggregateState(msg)) if msg.contains("duplicate")
        ));
    }

    #[test]
    fn test_add_rejects_non_numeric() {
        let mut h = ValueHistogram::new(&DataType::Int).unwrap();
        assert!(matches!(
            h.add(&Datum::String("x".to_string())),
            Err(ExecutorError::TypeMismatch { .. })
        ));
        assert!(ValueHistogram::new(&DataType::Text).is_err());
    }
}
