//! Query execution configuration

use std::env;
use std::str::FromStr;

use tokio::sync::Semaphore;

/// Default size hint for buffers downstream of a scanner (10 KiB)
pub const DEFAULT_ESTIMATED_SIZE: usize = 10 * 1024;

/// Default number of partitions aggregated concurrently
pub const DEFAULT_PARTITION_PARALLELISM: usize = 8;

/// Configuration for scanning and aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    /// Maximum rows returned by a scanner (0 = unlimited)
    pub max_rows: u64,

    /// Size hint reported by scanners
    pub estimated_size: usize,

    /// Partition aggregation tasks allowed to run at once
    pub partition_parallelism: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            max_rows: 0,
            estimated_size: DEFAULT_ESTIMATED_SIZE,
            partition_parallelism: DEFAULT_PARTITION_PARALLELISM,
        }
    }
}

impl ExecConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from environment variables
    ///
    /// `ROODB_MAX_ROWS`, `ROODB_ESTIMATED_SIZE` and
    /// `ROODB_PARTITION_PARALLELISM`; unset or unparseable values keep the
    /// default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self::default()
            .with_max_rows(env_or("ROODB_MAX_ROWS", defaults.max_rows))
            .with_estimated_size(env_or("ROODB_ESTIMATED_SIZE", defaults.estimated_size))
            .with_partition_parallelism(env_or(
                "ROODB_PARTITION_PARALLELISM",
                defaults.partition_parallelism,
            ))
    }

    /// Set the row cap (0 = unlimited)
    pub fn with_max_rows(mut self, max_rows: u64) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Set the scanner size hint
    pub fn with_estimated_size(mut self, size: usize) -> Self {
        self.estimated_size = size;
        self
    }

    /// Set the partition parallelism, clamped to what a semaphore can hold
    pub fn with_partition_parallelism(mut self, parallelism: usize) -> Self {
        self.partition_parallelism = parallelism.clamp(1, Semaphore::MAX_PERMITS);
        self
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(variable = name, value = %raw, "Ignoring unparseable setting");
                default
            }
        },
        Err(_) => default,
    }
}
