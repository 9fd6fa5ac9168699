//! Column references and column projection
//!
//! The simplest compiled forms of [`Expression`] and [`RowProjector`]: pick
//! columns out of a row by position.

use crate::catalog::DataType;

use super::datum::Datum;
use super::error::{ExecutorError, ExecutorResult};
use super::row::Row;
use super::{Expression, RowProjector};

/// Reference to one column of the input row
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Column name
    pub name: String,
    /// Position in the input row
    pub index: usize,
    /// Declared type
    pub data_type: DataType,
}

impl ColumnRef {
    /// Create a column reference
    pub fn new(name: impl Into<String>, index: usize, data_type: DataType) -> Self {
        ColumnRef {
            name: name.into(),
            index,
            data_type,
        }
    }
}

impl Expression for ColumnRef {
    fn evaluate(&self, row: &Row) -> ExecutorResult<Datum> {
        let datum = row.get(self.index)?;
        match datum.data_type() {
            // Values must fit the declared numeric family
            Some(got)
                if self.data_type.is_numeric()
                    && datum.coerce_numeric(&self.data_type).is_none() =>
            {
                Err(ExecutorError::TypeMismatch {
                    expected: self.data_type.clone(),
                    got,
                    context: format!("column {}", self.name),
                })
            }
            _ => Ok(datum.clone()),
        }
    }

    fn data_type(&self) -> DataType {
        self.data_type.clone()
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

/// Projector that keeps a subset of columns, in the given order
#[derive(Debug, Clone)]
pub struct ColumnProjector {
    columns: Vec<ColumnRef>,
    indices: Vec<usize>,
}

impl ColumnProjector {
    /// Create a projector over the given columns
    pub fn new(columns: Vec<ColumnRef>) -> Self {
        let indices = columns.iter().map(|c| c.index).collect();
        ColumnProjector { columns, indices }
    }

    /// Projector that passes rows through unchanged under the given names
    ///
    /// Column types are not checked by projection, so they are left as Text.
    pub fn identity(names: &[&str]) -> Self {
        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| ColumnRef::new(*name, i, DataType::Text))
            .collect();
        Self::new(columns)
    }
}

impl RowProjector for ColumnProjector {
    fn project(&self, row: &Row) -> ExecutorResult<Row> {
        row.project(&self.indices)
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ref_evaluate() {
        let col = ColumnRef::new("amount", 1, DataType::Double);
        let row = Row::new(vec![Datum::Int(1), Datum::Float(2.5)]);
        assert_eq!(col.evaluate(&row).unwrap(), Datum::Float(2.5));
        assert_eq!(col.display_name(), "amount");
    }

    #[test]
    fn test_column_ref_null_passes() {
        let col = ColumnRef::new("amount", 0, DataType::Int);
        let row = Row::new(vec![Datum::Null]);
        assert!(col.evaluate(&row).unwrap().is_null());
    }

    #[test]
    fn test_column_ref_type_mismatch() {
        let col = ColumnRef::new("amount", 0, DataType::Int);
        let row = Row::new(vec![Datum::String("ten".to_string())]);
        assert!(matches!(
            col.evaluate(&row),
            Err(ExecutorError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_column_ref_out_of_bounds() {
        let col = ColumnRef::new("missing", 3, DataType::Int);
        let row = Row::new(vec![Datum::Int(1)]);
        assert!(matches!(
            col.evaluate(&row),
            Err(ExecutorError::ColumnIndexOutOfBounds { index: 3, .. })
        ));
    }

    #[test]
    fn test_column_projector() {
        let projector = ColumnProjector::new(vec![
            ColumnRef::new("c", 2, DataType::Int),
            ColumnRef::new("a", 0, DataType::Int),
        ]);
        let row = Row::new(vec![Datum::Int(1), Datum::Int(2), Datum::Int(3)]);
        let projected = projector.project(&row).unwrap();
        assert_eq!(projected.values(), &[Datum::Int(3), Datum::Int(1)]);
        assert_eq!(projector.column_names(), vec!["c", "a"]);
    }
}
