//! Result rows
//!
//! A row is fixed once produced: stages build a new row instead of editing
//! the one they were handed.

use std::fmt;

use super::datum::Datum;
use super::error::{ExecutorError, ExecutorResult};

/// Fixed-arity sequence of values
///
/// Rows order column by column, which is also the order of group keys in
/// aggregate output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Row {
    values: Box<[Datum]>,
}

impl Row {
    pub fn new(values: Vec<Datum>) -> Self {
        Row {
            values: values.into_boxed_slice(),
        }
    }

    /// Row with no columns
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a column position
    pub fn get(&self, index: usize) -> ExecutorResult<&Datum> {
        self.values
            .get(index)
            .ok_or(ExecutorError::ColumnIndexOutOfBounds {
                index,
                row_len: self.values.len(),
            })
    }

    pub fn values(&self) -> &[Datum] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Datum> {
        self.values.into_vec()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Datum> {
        self.values.iter()
    }

    /// New row holding the given columns, in the given order
    pub fn project(&self, indices: &[usize]) -> ExecutorResult<Row> {
        let values = indices
            .iter()
            .map(|&i| self.get(i).cloned())
            .collect::<ExecutorResult<Vec<_>>>()?;
        Ok(Row::new(values))
    }

    /// This row followed by `tail`
    pub fn with_appended(self, tail: impl IntoIterator<Item = Datum>) -> Row {
        let mut values = self.into_values();
        values.extend(tail);
        Row::new(values)
    }
}

impl From<Vec<Datum>> for Row {
    fn from(values: Vec<Datum>) -> Self {
        Row::new(values)
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Datum;
    type IntoIter = std::slice::Iter<'a, Datum>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Tab-separated values
impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}
