//! Aggregation coordinator
//!
//! Runs one partial aggregation task per partition, at most
//! `partition_parallelism` at a time, and merges each partition's payload
//! into a single final aggregation as soon as the partition finishes.
//! The first failure cancels the remaining partitions. Cancellation is
//! cooperative: a partition checks the flag between rows and closes its
//! iterator before it stops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::ExecConfig;
use crate::executor::{ExecutorError, ExecutorResult, ResultIterator, ValuesIterator};

use super::group::{AggregatePlan, FinalAggregation, PartialAggregation};

/// Row source of one partition
pub struct PartitionScan {
    pub partition: u32,
    pub iterator: Box<dyn ResultIterator>,
}

impl PartitionScan {
    pub fn new(partition: u32, iterator: Box<dyn ResultIterator>) -> Self {
        PartitionScan {
            partition,
            iterator,
        }
    }
}

/// Drive one partition's rows through a partial aggregation
///
/// Stops with [`ExecutorError::Cancelled`] once `cancel` is set. The
/// iterator is closed on every exit path.
pub async fn aggregate_partition(
    plan: Arc<AggregatePlan>,
    partition: u32,
    iterator: &mut dyn ResultIterator,
    cancel: &AtomicBool,
) -> ExecutorResult<Bytes> {
    let mut partial = PartialAggregation::new(plan);
    let result = loop {
        if cancel.load(Ordering::Acquire) {
            break Err(ExecutorError::Cancelled);
        }
        match iterator.next().await {
            Ok(Some(row)) => {
                if let Err(e) = partial.accumulate(&row) {
                    break Err(e);
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    iterator.close();
    result?;

    let rows = partial.rows_seen();
    let groups = partial.group_count();
    let payload = partial.finish();
    tracing::debug!(
        partition,
        rows,
        groups,
        bytes = payload.len(),
        "Partition aggregated"
    );
    Ok(payload)
}

/// Coordinator-side state of one aggregation
pub struct AggregationCoordinator {
    plan: Arc<AggregatePlan>,
    /// Final aggregation, written by one partition at a time
    state: Mutex<FinalAggregation>,
}

impl AggregationCoordinator {
    pub fn new(plan: Arc<AggregatePlan>) -> Self {
        let state = Mutex::new(FinalAggregation::new(Arc::clone(&plan)));
        AggregationCoordinator { plan, state }
    }

    pub fn plan(&self) -> &Arc<AggregatePlan> {
        &self.plan
    }

    /// Merge one partition's payload
    pub fn merge_partition(&self, partition: u32, payload: &[u8]) -> ExecutorResult<()> {
        let mut state = self.state.lock();
        state.merge_partition(partition, payload)?;
        tracing::debug!(
            partition,
            bytes = payload.len(),
            merged = state.partitions_merged(),
            "Merged partition state"
        );
        Ok(())
    }

    /// Partitions merged so far
    pub fn partitions_merged(&self) -> usize {
        self.state.lock().partitions_merged()
    }

    /// Final rows as an iterator carrying `plan_steps`
    pub fn finish(self, plan_steps: Vec<String>) -> ExecutorResult<ValuesIterator> {
        let rows = self.state.into_inner().finish()?;
        Ok(ValuesIterator::new(rows, plan_steps))
    }

    /// Aggregate all partitions and return the final rows
    pub async fn execute(
        plan: Arc<AggregatePlan>,
        partitions: Vec<PartitionScan>,
        config: &ExecConfig,
    ) -> ExecutorResult<ValuesIterator> {
        let mut plan_steps = Vec::new();
        for scan in &partitions {
            scan.iterator.explain(&mut plan_steps);
        }
        plan_steps.push(plan.server_step());
        plan_steps.push(format!("CLIENT MERGE {} PARTITIONS", partitions.len()));

        let coordinator = Arc::new(AggregationCoordinator::new(Arc::clone(&plan)));
        let permits = config
            .partition_parallelism
            .clamp(1, Semaphore::MAX_PERMITS);
        let slots = Arc::new(Semaphore::new(permits));
        let cancel = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();

        for PartitionScan {
            partition,
            mut iterator,
        } in partitions
        {
            let plan = Arc::clone(&plan);
            let coordinator = Arc::clone(&coordinator);
            let slots = Arc::clone(&slots);
            let cancel = Arc::clone(&cancel);
            tasks.spawn(async move {
                let _permit = match slots.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        iterator.close();
                        return Err(ExecutorError::Internal(format!(
                            "partition slot unavailable: {}",
                            e
                        )));
                    }
                };
                let payload = aggregate_partition(plan, partition, &mut *iterator, &cancel)
                    .await
                    .map_err(|e| e.in_partition(partition))?;
                coordinator.merge_partition(partition, &payload)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| ExecutorError::Internal(format!("partition task failed: {}", e)))
                .and_then(|result| result);
            if let Err(e) = outcome {
                tracing::warn!(error = %e, "Aggregation failed, cancelling remaining partitions");
                cancel.store(true, Ordering::Release);
                // Let every partition close its iterator before returning
                while tasks.join_next().await.is_some() {}
                return Err(e);
            }
        }

        let coordinator = Arc::try_unwrap(coordinator).map_err(|_| {
            ExecutorError::Internal("coordinator still shared after all partitions".to_string())
        })?;
        coordinator.finish(plan_steps)
    }
}
