//! Catalog - column types seen by the execution layer
//!
//! Schema metadata lives outside this crate; the executor only needs the
//! declared data types of expressions to validate aggregate arguments and
//! to pick the wire encoding of aggregate state.

use std::fmt;

/// Declared type of a column or expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    /// Single precision, widened to Double for arithmetic
    Float,
    Double,
    /// rust_decimal, 96-bit mantissa
    Decimal,
    /// Bounded string, max length in characters
    Varchar(u32),
    Text,
    Blob,
    /// Unix milliseconds
    Timestamp,
}

impl DataType {
    /// Integer, floating point or decimal
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, DataType::Float | DataType::Double | DataType::Decimal)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::TinyInt | DataType::SmallInt | DataType::Int | DataType::BigInt
        )
    }

    /// Widest type of the same numeric family
    ///
    /// Integers widen to BigInt, floating point to Double. Returns `None`
    /// for non-numeric types.
    pub fn widened(&self) -> Option<DataType> {
        match self {
            t if t.is_integer() => Some(DataType::BigInt),
            DataType::Float | DataType::Double => Some(DataType::Double),
            DataType::Decimal => Some(DataType::Decimal),
            _ => None,
        }
    }
}

/// SQL spelling, as used in error messages
impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::TinyInt => write!(f, "TINYINT"),
            DataType::SmallInt => write!(f, "SMALLINT"),
            DataType::Int => write!(f, "INT"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Decimal => write!(f, "DECIMAL"),
            DataType::Varchar(n) => write!(f, "VARCHAR({})", n),
            DataType::Text => write!(f, "TEXT"),
            DataType::Blob => write!(f, "BLOB"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}
