//! Row value representation between the source reader and the normalizer.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

/// A single value read from the source, tagged by its wire representation.
///
/// The column's [`ColumnType`](super::ColumnType) decides how it is rendered,
/// so the same tag may be encoded differently per column (bytes from a `bit`
/// column versus bytes from a `blob`).
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    /// Character data, including decimals sent as text.
    Text(String),
    /// Binary data, or character data that is not valid UTF-8.
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Signed duration, as MySQL `time` values may exceed a day or be negative.
    Time(TimeDelta),
}

impl SqlValue {
    /// Whether this value counts as false for a boolean column.
    ///
    /// NULL and any zero representation are false; everything else is true.
    pub fn is_falsy(&self) -> bool {
        match self {
            SqlValue::Null => true,
            SqlValue::Int(v) => *v == 0,
            SqlValue::UInt(v) => *v == 0,
            SqlValue::Float(v) => *v == 0.0,
            SqlValue::Double(v) => *v == 0.0,
            SqlValue::Text(s) => s.trim().parse::<f64>().map(|v| v == 0.0).unwrap_or(false),
            SqlValue::Bytes(b) => b.iter().all(|&byte| byte == 0),
            SqlValue::Date(_) | SqlValue::DateTime(_) | SqlValue::Time(_) => false,
        }
    }
}

/// One source row, parallel to the table's column order.
pub type Row = Vec<SqlValue>;
