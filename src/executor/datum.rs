//! Datum - one cell value flowing through the executor
//!
//! Equality, ordering and hashing are strict per variant: `Int(1)` and
//! `Float(1.0)` are different datums. Code that needs numeric equality
//! across representations canonicalizes first with [`Datum::coerce_numeric`].

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::catalog::DataType;

/// A single value in a row
#[derive(Debug, Clone, Default)]
pub enum Datum {
    #[default]
    Null,
    Bool(bool),
    /// Every integer width
    Int(i64),
    /// Float and Double
    Float(f64),
    Decimal(Decimal),
    /// Varchar and Text
    String(String),
    Bytes(Vec<u8>),
    /// Unix milliseconds
    Timestamp(i64),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Rank of the variant; NULL sorts first
    fn rank(&self) -> u8 {
        match self {
            Datum::Null => 0,
            Datum::Bool(_) => 1,
            Datum::Int(_) => 2,
            Datum::Float(_) => 3,
            Datum::Decimal(_) => 4,
            Datum::String(_) => 5,
            Datum::Bytes(_) => 6,
            Datum::Timestamp(_) => 7,
        }
    }

    /// Type of the value as stored, None for NULL
    pub fn data_type(&self) -> Option<DataType> {
        let data_type = match self {
            Datum::Null => return None,
            Datum::Bool(_) => DataType::Boolean,
            Datum::Int(_) => DataType::BigInt,
            Datum::Float(_) => DataType::Double,
            Datum::Decimal(_) => DataType::Decimal,
            Datum::String(_) => DataType::Text,
            Datum::Bytes(_) => DataType::Blob,
            Datum::Timestamp(_) => DataType::Timestamp,
        };
        Some(data_type)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Datum::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as f64; decimals outside f64 range give None
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Datum::Int(i) => Some(*i as f64),
            Datum::Float(f) => Some(*f),
            Datum::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Numeric value as a decimal; NaN and infinities give None
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Datum::Int(i) => Some(Decimal::from(*i)),
            Datum::Float(f) => Decimal::from_f64_retain(*f),
            Datum::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Coerce a numeric datum into the widened representation of `target`
    ///
    /// The result is canonical: equal numbers produce identical datums
    /// (`-0.0` becomes `0.0`, decimals are normalized). NULL stays NULL.
    /// Returns `None` when the value cannot be represented in `target`.
    pub fn coerce_numeric(&self, target: &DataType) -> Option<Datum> {
        if self.is_null() {
            return Some(Datum::Null);
        }
        match (target.widened()?, self) {
            (DataType::BigInt, Datum::Int(i)) => Some(Datum::Int(*i)),
            (DataType::Double, Datum::Int(_) | Datum::Float(_)) => {
                self.as_float().map(|f| Datum::Float(f + 0.0))
            }
            (DataType::Decimal, Datum::Int(_) | Datum::Float(_) | Datum::Decimal(_)) => {
                self.as_decimal().map(|d| Datum::Decimal(d.normalize()))
            }
            _ => None,
        }
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Datum {}

impl PartialOrd for Datum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Total order: by variant rank, then by value (floats by `total_cmp`)
impl Ord for Datum {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Datum::Bool(a), Datum::Bool(b)) => a.cmp(b),
            (Datum::Int(a), Datum::Int(b)) => a.cmp(b),
            (Datum::Float(a), Datum::Float(b)) => a.total_cmp(b),
            (Datum::Decimal(a), Datum::Decimal(b)) => a.cmp(b),
            (Datum::String(a), Datum::String(b)) => a.cmp(b),
            (Datum::Bytes(a), Datum::Bytes(b)) => a.cmp(b),
            (Datum::Timestamp(a), Datum::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Datum {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Datum::Null => {}
            Datum::Bool(b) => b.hash(state),
            Datum::Int(i) | Datum::Timestamp(i) => i.hash(state),
            Datum::Float(f) => f.to_bits().hash(state),
            // Decimal equality ignores scale
            Datum::Decimal(d) => d.normalize().serialize().hash(state),
            Datum::String(s) => s.hash(state),
            Datum::Bytes(b) => b.hash(state),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Datum::Int(i) | Datum::Timestamp(i) => write!(f, "{}", i),
            Datum::Float(v) => write!(f, "{}", v),
            Datum::Decimal(d) => write!(f, "{}", d),
            Datum::String(s) => write!(f, "{}", s),
            Datum::Bytes(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}
