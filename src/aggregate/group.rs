//! Grouped two-phase aggregation
//!
//! [`PartialAggregation`] runs inside one partition: rows are grouped by the
//! evaluated GROUP BY key and each group gets one server aggregator per
//! aggregate. Its payload is the only thing shipped to the coordinator:
//!
//! ```text
//! [group count:varint]
//!   {[key len:varint][key row][aggregate count:varint]{[state len:varint][state]}*}*
//! ```
//!
//! Keys use the row codec and groups are ordered by encoded key bytes.
//! [`FinalAggregation`] merges these payloads into one client aggregator
//! per (group, aggregate).

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};

use crate::executor::encoding::{decode_row, encode_row, put_varint, Decoder};
use crate::executor::{Datum, ExecutorError, ExecutorResult, Expression, Row};

use super::registry::BoundAggregate;
use super::{ClientAggregator, ServerAggregator};

/// GROUP BY expressions and the aggregates computed per group
#[derive(Debug, Clone)]
pub struct AggregatePlan {
    group_by: Vec<Arc<dyn Expression>>,
    aggregates: Vec<BoundAggregate>,
}

impl AggregatePlan {
    pub fn new(group_by: Vec<Arc<dyn Expression>>, aggregates: Vec<BoundAggregate>) -> Self {
        AggregatePlan {
            group_by,
            aggregates,
        }
    }

    /// Aggregates over all rows, producing one output row
    pub fn scalar(aggregates: Vec<BoundAggregate>) -> Self {
        Self::new(Vec::new(), aggregates)
    }

    pub fn group_by(&self) -> &[Arc<dyn Expression>] {
        &self.group_by
    }

    pub fn aggregates(&self) -> &[BoundAggregate] {
        &self.aggregates
    }

    /// Output column names: group keys, then aggregates
    pub fn output_names(&self) -> Vec<String> {
        self.group_by
            .iter()
            .map(|e| e.display_name())
            .chain(self.aggregates.iter().map(|a| a.display_name()))
            .collect()
    }

    /// Explain step for the partition-side pass
    pub fn server_step(&self) -> String {
        let aggregates: Vec<String> = self.aggregates.iter().map(|a| a.display_name()).collect();
        if self.group_by.is_empty() {
            format!("SERVER AGGREGATE [{}] INTO SINGLE ROW", aggregates.join(", "))
        } else {
            let keys: Vec<String> = self.group_by.iter().map(|e| e.display_name()).collect();
            format!(
                "SERVER AGGREGATE [{}] INTO DISTINCT ROWS BY [{}]",
                aggregates.join(", "),
                keys.join(", ")
            )
        }
    }

    /// Evaluate the group key of a row
    ///
    /// Numeric keys are canonicalized so equal numbers land in one group.
    fn group_key(&self, row: &Row) -> ExecutorResult<Row> {
        let mut key = Vec::with_capacity(self.group_by.len());
        for expr in &self.group_by {
            let value = expr.evaluate(row)?;
            let data_type = expr.data_type();
            let value = match value.coerce_numeric(&data_type) {
                Some(canonical) if data_type.is_numeric() => canonical,
                _ => value,
            };
            key.push(value);
        }
        Ok(Row::new(key))
    }

    fn new_server_aggregators(&self) -> ExecutorResult<Vec<Box<dyn ServerAggregator>>> {
        self.aggregates
            .iter()
            .map(|a| a.new_server_aggregator())
            .collect()
    }

    fn new_client_aggregators(&self) -> ExecutorResult<Vec<Box<dyn ClientAggregator>>> {
        self.aggregates
            .iter()
            .map(|a| a.new_client_aggregator())
            .collect()
    }
}

/// Partition-side grouping and partial aggregation
pub struct PartialAggregation {
    plan: Arc<AggregatePlan>,
    groups: HashMap<Row, Vec<Box<dyn ServerAggregator>>>,
    rows_seen: u64,
}

impl PartialAggregation {
    pub fn new(plan: Arc<AggregatePlan>) -> Self {
        PartialAggregation {
            plan,
            groups: HashMap::new(),
            rows_seen: 0,
        }
    }

    /// Fold one input row into its group
    pub fn accumulate(&mut self, row: &Row) -> ExecutorResult<()> {
        let key = self.plan.group_key(row)?;
        let aggregators = match self.groups.entry(key) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(self.plan.new_server_aggregators()?),
        };
        for aggregator in aggregators.iter_mut() {
            aggregator.accumulate(row)?;
        }
        self.rows_seen += 1;
        Ok(())
    }

    /// Input rows accumulated
    pub fn rows_seen(&self) -> u64 {
        self.rows_seen
    }

    /// Groups formed so far
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Serialize every group's partial states
    pub fn finish(self) -> Bytes {
        let mut groups: Vec<(Vec<u8>, Vec<Bytes>)> = self
            .groups
            .into_iter()
            .map(|(key, aggregators)| {
                let states = aggregators.iter().map(|a| a.serialize_state()).collect();
                (encode_row(&key), states)
            })
            .collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));

        let mut buf = BytesMut::new();
        put_varint(&mut buf, groups.len() as u64);
        for (key, states) in &groups {
            put_varint(&mut buf, key.len() as u64);
            buf.put_slice(key);
            put_varint(&mut buf, states.len() as u64);
            for state in states {
                put_varint(&mut buf, state.len() as u64);
                buf.put_slice(state);
            }
        }
        buf.freeze()
    }
}

/// One group of a decoded partition payload
struct PartialGroup<'a> {
    key: Row,
    states: Vec<&'a [u8]>,
}

/// Coordinator-side merge of partition payloads
pub struct FinalAggregation {
    plan: Arc<AggregatePlan>,
    groups: HashMap<Row, Vec<Box<dyn ClientAggregator>>>,
    merged_partitions: HashSet<u32>,
}

impl FinalAggregation {
    pub fn new(plan: Arc<AggregatePlan>) -> Self {
        FinalAggregation {
            plan,
            groups: HashMap::new(),
            merged_partitions: HashSet::new(),
        }
    }

    /// Partitions merged so far
    pub fn partitions_merged(&self) -> usize {
        self.merged_partitions.len()
    }

    /// Merge the payload of one partition
    ///
    /// A partition may be merged only once. Every aggregate state in the
    /// payload is validated before any group is touched, so a rejected
    /// payload leaves the aggregation as it was.
    pub fn merge_partition(&mut self, partition: u32, payload: &[u8]) -> ExecutorResult<()> {
        if self.merged_partitions.contains(&partition) {
            return Err(ExecutorError::DuplicatePartition(partition));
        }
        self.merge_payload(payload)
            .map_err(|e| e.in_partition(partition))?;
        self.merged_partitions.insert(partition);
        Ok(())
    }

    fn merge_payload(&mut self, payload: &[u8]) -> ExecutorResult<()> {
        let groups = self.decode_payload(payload).map_err(|e| match e {
            ExecutorError::Encoding(msg) => ExecutorError::AggregateState(msg),
            other => other,
        })?;

        // Stage each group into fresh aggregators
        let mut staged = Vec::with_capacity(groups.len());
        for group in groups {
            let mut aggregators = self.plan.new_client_aggregators()?;
            for (aggregator, state) in aggregators.iter_mut().zip(group.states) {
                aggregator.merge_state(state)?;
            }
            staged.push((group.key, aggregators));
        }

        for (key, aggregators) in staged {
            match self.groups.entry(key) {
                Entry::Vacant(e) => {
                    e.insert(aggregators);
                }
                Entry::Occupied(mut e) => {
                    for (current, partial) in e.get_mut().iter_mut().zip(&aggregators) {
                        current.merge_state(&partial.serialize_state())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn decode_payload<'a>(&self, payload: &'a [u8]) -> ExecutorResult<Vec<PartialGroup<'a>>> {
        let expected_aggregates = self.plan.aggregates().len();
        let mut decoder = Decoder::new(payload);

        let group_count = decoder.varint("group count")?;
        // Every group takes at least 3 bytes
        let mut groups = Vec::with_capacity((group_count as usize).min(decoder.remaining() / 3));
        for _ in 0..group_count {
            let key_len = read_len(&mut decoder, "group key length")?;
            let key = decode_row(decoder.take(key_len, "group key")?)?;
            if key.len() != self.plan.group_by().len() {
                return Err(ExecutorError::AggregateState(format!(
                    "group key has {} columns, expected {}",
                    key.len(),
                    self.plan.group_by().len()
                )));
            }

            let aggregate_count = read_len(&mut decoder, "aggregate count")?;
            if aggregate_count != expected_aggregates {
                return Err(ExecutorError::AggregateState(format!(
                    "group carries {} aggregate states, expected {}",
                    aggregate_count, expected_aggregates
                )));
            }
            let mut states = Vec::with_capacity(aggregate_count);
            for _ in 0..aggregate_count {
                let state_len = read_len(&mut decoder, "aggregate state length")?;
                states.push(decoder.take(state_len, "aggregate state")?);
            }
            groups.push(PartialGroup { key, states });
        }

        if !decoder.is_empty() {
            return Err(ExecutorError::AggregateState(format!(
                "{} trailing bytes after partition payload",
                decoder.remaining()
            )));
        }
        Ok(groups)
    }

    /// Final rows: group key values followed by aggregate results
    ///
    /// Rows are ordered by group key. Without GROUP BY there is always
    /// exactly one row, holding each aggregate's identity when no partition
    /// contributed any rows.
    pub fn finish(self) -> ExecutorResult<Vec<Row>> {
        if self.groups.is_empty() && self.plan.group_by().is_empty() {
            let values = self
                .plan
                .new_client_aggregators()?
                .iter()
                .map(|a| a.final_result())
                .collect::<Vec<Datum>>();
            return Ok(vec![Row::new(values)]);
        }

        let mut groups: Vec<_> = self.groups.into_iter().collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(groups
            .into_iter()
            .map(|(key, aggregators)| {
                key.with_appended(aggregators.iter().map(|a| a.final_result()))
            })
            .collect())
    }
}

fn read_len(decoder: &mut Decoder<'_>, what: &str) -> ExecutorResult<usize> {
    let len = decoder.varint(what)?;
    usize::try_from(len)
        .map_err(|_| ExecutorError::AggregateState(format!("{} too large: {}", what, len)))
}
