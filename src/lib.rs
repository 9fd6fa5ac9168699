//! RooDB query layer - composable result iterators and two-phase aggregation
//!
//! Features:
//! - Pull-based result iterators with row capping and explain plans
//! - Partition-side partial aggregation shipped as compact histograms
//! - Coordinator-side merge with STDDEV_POP, STDDEV_SAMP and MEDIAN

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod executor;
pub mod planner;
pub mod storage;
