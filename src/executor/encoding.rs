//! Row and value encoding
//!
//! Row value format: `[num_cols:u16][datum...]`, each datum `[tag:u8][data...]`.
//! Aggregate state payloads reuse the datum tags and the LEB128 varints
//! defined here.

use bytes::BufMut;
use rust_decimal::Decimal;

use crate::catalog::DataType;

use super::datum::Datum;
use super::error::{ExecutorError, ExecutorResult};
use super::row::Row;

// Datum type tags
pub const TAG_NULL: u8 = 0;
pub const TAG_BOOL: u8 = 1;
pub const TAG_INT: u8 = 2;
pub const TAG_FLOAT: u8 = 3;
pub const TAG_STRING: u8 = 4;
pub const TAG_BYTES: u8 = 5;
pub const TAG_TIMESTAMP: u8 = 6;
pub const TAG_DECIMAL: u8 = 7;

/// Longest LEB128 encoding of a u64
const MAX_VARINT_LEN: usize = 10;

/// Sequential reader over an encoded buffer
///
/// Every read is bounds-checked; running past the end is an encoding error
/// rather than a panic.
pub struct Decoder<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Decoder { data, offset: 0 }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `len` bytes
    pub fn take(&mut self, len: usize, what: &str) -> ExecutorResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(ExecutorError::Encoding(format!(
                "{} too short: need {} bytes at offset {}, have {}",
                what,
                len,
                self.offset,
                self.remaining()
            )));
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &str) -> ExecutorResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    pub fn u8(&mut self, what: &str) -> ExecutorResult<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub fn u16_le(&mut self, what: &str) -> ExecutorResult<u16> {
        Ok(u16::from_le_bytes(self.array(what)?))
    }

    pub fn u32_le(&mut self, what: &str) -> ExecutorResult<u32> {
        Ok(u32::from_le_bytes(self.array(what)?))
    }

    pub fn i64_le(&mut self, what: &str) -> ExecutorResult<i64> {
        Ok(i64::from_le_bytes(self.array(what)?))
    }

    pub fn f64_le(&mut self, what: &str) -> ExecutorResult<f64> {
        Ok(f64::from_le_bytes(self.array(what)?))
    }

    pub fn decimal(&mut self, what: &str) -> ExecutorResult<Decimal> {
        Ok(Decimal::deserialize(self.array(what)?))
    }

    /// Read an unsigned LEB128 varint
    pub fn varint(&mut self, what: &str) -> ExecutorResult<u64> {
        let mut value: u64 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.u8(what)?;
            let bits = (byte & 0x7f) as u64;
            // The tenth byte may only carry the top bit of a u64
            if i == MAX_VARINT_LEN - 1 && bits > 1 {
                return Err(ExecutorError::Encoding(format!("{} varint overflows u64", what)));
            }
            value |= bits << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ExecutorError::Encoding(format!("{} varint too long", what)))
    }
}

/// Append an unsigned LEB128 varint
pub fn put_varint<B: BufMut>(buf: &mut B, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Wire tag of the widened numeric type, None for non-numeric types
pub fn numeric_tag(data_type: &DataType) -> Option<u8> {
    match data_type.widened()? {
        DataType::BigInt => Some(TAG_INT),
        DataType::Double => Some(TAG_FLOAT),
        DataType::Decimal => Some(TAG_DECIMAL),
        _ => None,
    }
}

/// Widened numeric type for a wire tag
pub fn numeric_type_for_tag(tag: u8) -> Option<DataType> {
    match tag {
        TAG_INT => Some(DataType::BigInt),
        TAG_FLOAT => Some(DataType::Double),
        TAG_DECIMAL => Some(DataType::Decimal),
        _ => None,
    }
}

/// Encode a numeric value without its tag
///
/// The caller has already written the tag; the datum must match it.
pub fn put_numeric<B: BufMut>(buf: &mut B, tag: u8, value: &Datum) -> ExecutorResult<()> {
    match (tag, value) {
        (TAG_INT, Datum::Int(i)) => buf.put_i64_le(*i),
        (TAG_FLOAT, Datum::Float(f)) => buf.put_f64_le(*f),
        (TAG_DECIMAL, Datum::Decimal(d)) => buf.put_slice(&d.serialize()),
        _ => {
            return Err(ExecutorError::Encoding(format!(
                "value {:?} does not match numeric tag {}",
                value, tag
            )))
        }
    }
    Ok(())
}

/// Decode a numeric value without its tag
pub fn get_numeric(decoder: &mut Decoder<'_>, tag: u8) -> ExecutorResult<Datum> {
    match tag {
        TAG_INT => Ok(Datum::Int(decoder.i64_le("int value")?)),
        TAG_FLOAT => Ok(Datum::Float(decoder.f64_le("float value")?)),
        TAG_DECIMAL => Ok(Datum::Decimal(decoder.decimal("decimal value")?)),
        _ => Err(ExecutorError::Encoding(format!("unknown numeric tag: {}", tag))),
    }
}

/// Encode a row value
///
/// Format: [num_cols:u16][datum...]
/// Each datum: [tag:u8][data...]
pub fn encode_row(row: &Row) -> Vec<u8> {
    let mut buf = Vec::new();

    // Number of columns
    buf.put_u16_le(row.len() as u16);

    for datum in row.iter() {
        encode_datum(&mut buf, datum);
    }

    buf
}

/// Encode a single datum
fn encode_datum(buf: &mut Vec<u8>, datum: &Datum) {
    match datum {
        Datum::Null => buf.put_u8(TAG_NULL),
        Datum::Bool(b) => {
            buf.put_u8(TAG_BOOL);
            buf.put_u8(if *b { 1 } else { 0 });
        }
        Datum::Int(i) => {
            buf.put_u8(TAG_INT);
            buf.put_i64_le(*i);
        }
        Datum::Float(f) => {
            buf.put_u8(TAG_FLOAT);
            buf.put_f64_le(*f);
        }
        Datum::Decimal(d) => {
            buf.put_u8(TAG_DECIMAL);
            buf.put_slice(&d.serialize());
        }
        Datum::String(s) => {
            buf.put_u8(TAG_STRING);
            buf.put_u32_le(s.len() as u32);
            buf.put_slice(s.as_bytes());
        }
        Datum::Bytes(b) => {
            buf.put_u8(TAG_BYTES);
            buf.put_u32_le(b.len() as u32);
            buf.put_slice(b);
        }
        Datum::Timestamp(t) => {
            buf.put_u8(TAG_TIMESTAMP);
            buf.put_i64_le(*t);
        }
    }
}

/// Decode a row value
pub fn decode_row(data: &[u8]) -> ExecutorResult<Row> {
    let mut decoder = Decoder::new(data);
    let row = decode_row_from(&mut decoder)?;
    if !decoder.is_empty() {
        return Err(ExecutorError::Encoding(format!(
            "{} trailing bytes after row",
            decoder.remaining()
        )));
    }
    Ok(row)
}

/// Decode a row value from the current decoder position
pub fn decode_row_from(decoder: &mut Decoder<'_>) -> ExecutorResult<Row> {
    let num_cols = decoder.u16_le("row header")? as usize;
    let mut values = Vec::with_capacity(num_cols);

    for _ in 0..num_cols {
        values.push(decode_datum(decoder)?);
    }

    Ok(Row::new(values))
}

/// Decode a single datum
fn decode_datum(decoder: &mut Decoder<'_>) -> ExecutorResult<Datum> {
    let tag = decoder.u8("datum tag")?;
    match tag {
        TAG_NULL => Ok(Datum::Null),
        TAG_BOOL => Ok(Datum::Bool(decoder.u8("bool data")? != 0)),
        TAG_INT | TAG_FLOAT | TAG_DECIMAL => get_numeric(decoder, tag),
        TAG_STRING => {
            let len = decoder.u32_le("string header")? as usize;
            let bytes = decoder.take(len, "string data")?;
            let s = String::from_utf8(bytes.to_vec())
                .map_err(|_| ExecutorError::Encoding("invalid utf8 in string".to_string()))?;
            Ok(Datum::String(s))
        }
        TAG_BYTES => {
            let len = decoder.u32_le("bytes header")? as usize;
            Ok(Datum::Bytes(decoder.take(len, "bytes data")?.to_vec()))
        }
        TAG_TIMESTAMP => Ok(Datum::Timestamp(decoder.i64_le("timestamp data")?)),
        _ => Err(ExecutorError::Encoding(format!(
            "unknown datum tag: {}",
            tag
        ))),
    }
}
