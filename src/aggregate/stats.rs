//! Numeric helpers for histogram-based aggregates
//!
//! All functions take `(value, count)` pairs in ascending value order.
//! Feeding them the same histogram always produces bit-identical results,
//! which keeps final aggregates independent of partition merge order.

/// Running sum with Neumaier compensation
#[derive(Debug, Clone, Copy, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - t) + x;
        } else {
            self.compensation += (x - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Number of observations in a histogram
pub fn total_count(entries: &[(f64, u64)]) -> u64 {
    entries.iter().map(|(_, c)| *c).sum()
}

/// Mean weighted by counts, None for an empty histogram
pub fn weighted_mean(entries: &[(f64, u64)]) -> Option<f64> {
    let n = total_count(entries);
    if n == 0 {
        return None;
    }
    let mut sum = CompensatedSum::new();
    for (value, count) in entries {
        sum.add(value * *count as f64);
    }
    Some(sum.value() / n as f64)
}

/// Σ c·(v − mean)²
pub fn sum_squared_deviations(entries: &[(f64, u64)], mean: f64) -> f64 {
    let mut sum = CompensatedSum::new();
    for (value, count) in entries {
        let d = value - mean;
        sum.add(*count as f64 * d * d);
    }
    sum.value()
}

/// Population variance, None for an empty histogram
pub fn population_variance(entries: &[(f64, u64)]) -> Option<f64> {
    let n = total_count(entries);
    let mean = weighted_mean(entries)?;
    Some(sum_squared_deviations(entries, mean) / n as f64)
}

/// Sample variance, None with fewer than two observations
pub fn sample_variance(entries: &[(f64, u64)]) -> Option<f64> {
    let n = total_count(entries);
    if n < 2 {
        return None;
    }
    let mean = weighted_mean(entries)?;
    Some(sum_squared_deviations(entries, mean) / (n - 1) as f64)
}

/// Continuous percentile (linear interpolation between closest ranks)
///
/// `fraction` is clamped to `[0, 1]`. None for an empty histogram.
pub fn percentile_cont(entries: &[(f64, u64)], fraction: f64) -> Option<f64> {
    let n = total_count(entries);
    if n == 0 {
        return None;
    }
    let position = fraction.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower_rank = position.floor() as u64;
    let upper_rank = position.ceil() as u64;

    let lower = value_at_rank(entries, lower_rank)?;
    let upper = value_at_rank(entries, upper_rank)?;
    Some(lower + (position - lower_rank as f64) * (upper - lower))
}

/// Value of the observation at a 0-based rank
fn value_at_rank(entries: &[(f64, u64)], rank: u64) -> Option<f64> {
    let mut seen = 0u64;
    for (value, count) in entries {
        seen += count;
        if rank < seen {
            return Some(*value);
        }
    }
    None
}
