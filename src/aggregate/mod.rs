//! Two-phase aggregation
//!
//! Aggregates are split between the storage side and the coordinator:
//!
//! - A [`ServerAggregator`] runs inside a partition, folds every row of one
//!   group and serializes a compact partial state.
//! - A [`ClientAggregator`] runs at the coordinator, merges partial states
//!   from all partitions in any order and produces the final value.
//!
//! Functions are looked up in a static registry ([`registry`]) which pairs
//! an argument validator with the two factories.

pub mod coordinator;
pub mod distinct_value;
pub mod group;
pub mod histogram;
pub mod median;
pub mod registry;
pub mod stats;
pub mod stddev;

use bytes::Bytes;

use crate::executor::{Datum, ExecutorResult, Row};

pub use coordinator::{AggregationCoordinator, PartitionScan};
pub use distinct_value::DistinctValueWithCountServerAggregator;
pub use group::{AggregatePlan, FinalAggregation, PartialAggregation};
pub use histogram::ValueHistogram;
pub use median::MedianAggregator;
pub use registry::{get_aggregate, is_aggregate, resolve, AggregateFunctionDef, BoundAggregate};
pub use stddev::{StddevPopAggregator, StddevSampAggregator};

/// Partial aggregation inside a partition
///
/// Owned by exactly one partition task, so no internal locking.
pub trait ServerAggregator: Send {
    /// Fold one row into the state; NULL arguments are skipped
    fn accumulate(&mut self, row: &Row) -> ExecutorResult<()>;

    /// Self-contained encoding of the state, independent of partition
    fn serialize_state(&self) -> Bytes;

    /// Value of the aggregate over the rows seen so far
    fn final_result(&self) -> Datum;
}

/// Final aggregation at the coordinator
///
/// Merging is associative and commutative. Offering the same partition
/// twice is the caller's concern.
pub trait ClientAggregator: Send {
    /// Merge one serialized partial state
    fn merge_state(&mut self, state: &[u8]) -> ExecutorResult<()>;

    /// Encoding of the merged state, in the same format `merge_state` reads
    fn serialize_state(&self) -> Bytes;

    /// Final value; the function's identity when nothing was merged
    fn final_result(&self) -> Datum;
}
