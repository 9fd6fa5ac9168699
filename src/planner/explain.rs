//! EXPLAIN output
//!
//! An explain plan is the ordered list of steps contributed by each stage of
//! an iterator stack. Wrappers delegate to their input first and then add
//! their own steps, so the list reads from the innermost stage outward.

use std::fmt;

use crate::executor::ResultIterator;

/// Typical depth of an iterator stack
const EXPECTED_PLAN_STEPS: usize = 5;

/// Ordered, human-readable plan steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplainPlan {
    steps: Vec<String>,
}

impl ExplainPlan {
    /// Wrap already collected steps
    pub fn new(steps: Vec<String>) -> Self {
        ExplainPlan { steps }
    }

    /// Ask an iterator stack to describe itself
    ///
    /// Only `explain()` is called; the iterator is not advanced.
    pub fn collect<I: ResultIterator + ?Sized>(iter: &I) -> Self {
        let mut steps = Vec::with_capacity(EXPECTED_PLAN_STEPS);
        iter.explain(&mut steps);
        ExplainPlan { steps }
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<String> {
        self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}
