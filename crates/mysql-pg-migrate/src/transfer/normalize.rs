//! Row value normalization into PostgreSQL COPY text format.
//!
//! Encoding is a total function of (column, value): every combination yields
//! a COPY field. Fields are appended to a caller-owned buffer so a row costs
//! one allocation at most.

use std::fmt::Write;

use chrono::{NaiveDateTime, TimeDelta, Timelike};

use crate::core::schema::{Column, ColumnType};
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

/// COPY text marker for NULL.
pub const NULL_MARKER: &str = "\\N";

/// Stand-in for NULL in timestamp columns that declare a default.
pub const EPOCH_TIMESTAMP: &str = "1970-01-01 00:00:00";

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Append one row as a tab-separated, newline-terminated COPY line.
pub fn encode_row(columns: &[Column], row: &[SqlValue], out: &mut String) -> Result<()> {
    if columns.len() != row.len() {
        let table = columns.first().map(|c| c.table_name.as_str()).unwrap_or("");
        return Err(MigrateError::transfer(
            table,
            format!("row has {} values for {} columns", row.len(), columns.len()),
        ));
    }
    for (i, (column, value)) in columns.iter().zip(row).enumerate() {
        if i > 0 {
            out.push('\t');
        }
        encode_value(column, value, out);
    }
    out.push('\n');
    Ok(())
}

/// Append a single COPY field for `value` read from `column`.
pub fn encode_value(column: &Column, value: &SqlValue, out: &mut String) {
    match (&column.column_type, value) {
        // Booleans are never NULL: NULL and zero are false, anything else true.
        (ColumnType::Boolean, v) => out.push(if v.is_falsy() { 'f' } else { 't' }),

        (ty, SqlValue::Null) => {
            if ty.is_timestamp() && column.default.is_some() {
                out.push_str(EPOCH_TIMESTAMP);
            } else {
                out.push_str(NULL_MARKER);
            }
        }

        (ColumnType::Bit(width), SqlValue::Bytes(b)) => push_bits(bytes_to_u64(b), *width, out),
        (ColumnType::Bit(width), SqlValue::UInt(v)) => push_bits(*v, *width, out),
        (ColumnType::Bit(width), SqlValue::Int(v)) => push_bits(*v as u64, *width, out),

        (ColumnType::Bytea, SqlValue::Bytes(b)) => push_bytea(b, out),
        (ColumnType::Bytea, SqlValue::Text(s)) => push_bytea(s.as_bytes(), out),

        (ColumnType::Set(_), SqlValue::Text(s)) => push_text_array(s, out),

        (_, SqlValue::Text(s)) => escape_copy_text(s, out),
        (_, SqlValue::Bytes(b)) => escape_copy_text(&String::from_utf8_lossy(b), out),
        (_, SqlValue::Int(v)) => {
            let _ = write!(out, "{}", v);
        }
        (_, SqlValue::UInt(v)) => {
            let _ = write!(out, "{}", v);
        }
        (_, SqlValue::Float(v)) => {
            let _ = write!(out, "{}", v);
        }
        (_, SqlValue::Double(v)) => {
            let _ = write!(out, "{}", v);
        }
        (_, SqlValue::Date(d)) => {
            let _ = write!(out, "{}", d.format("%Y-%m-%d"));
        }
        (_, SqlValue::DateTime(dt)) => push_datetime(dt, out),
        (_, SqlValue::Time(t)) => push_time_of_day(*t, out),
    }
}

/// Escape text for COPY: backslash, newline, tab and carriage return become
/// escape sequences and NUL characters are dropped.
pub fn escape_copy_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => {}
            c => out.push(c),
        }
    }
}

fn push_bytea(bytes: &[u8], out: &mut String) {
    // `\\x` in COPY text decodes to the bytea hex prefix `\x`.
    out.push_str("\\\\x");
    out.push_str(&hex::encode(bytes));
}

fn bytes_to_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

fn push_bits(value: u64, width: u32, out: &mut String) {
    let _ = write!(out, "{:0width$b}", value, width = width as usize);
}

// MySQL sets arrive as `a,b,c`; PostgreSQL wants `{"a","b","c"}`.
fn push_text_array(s: &str, out: &mut String) {
    let mut array = String::with_capacity(s.len() + 2);
    array.push('{');
    if !s.is_empty() {
        for (i, member) in s.split(',').enumerate() {
            if i > 0 {
                array.push(',');
            }
            array.push('"');
            for c in member.chars() {
                if c == '"' || c == '\\' {
                    array.push('\\');
                }
                array.push(c);
            }
            array.push('"');
        }
    }
    array.push('}');
    escape_copy_text(&array, out);
}

fn push_datetime(dt: &NaiveDateTime, out: &mut String) {
    if dt.nanosecond() == 0 {
        let _ = write!(out, "{}", dt.format("%Y-%m-%dT%H:%M:%S"));
    } else {
        let _ = write!(out, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.6f"));
    }
}

// Durations are rendered as the wall-clock time that far past midnight.
fn push_time_of_day(delta: TimeDelta, out: &mut String) {
    let micros = delta
        .num_microseconds()
        .unwrap_or(0)
        .rem_euclid(MICROS_PER_DAY);
    let secs = micros / 1_000_000;
    let frac = micros % 1_000_000;
    let _ = write!(
        out,
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    );
    if frac != 0 {
        let _ = write!(out, ".{:06}", frac);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn column(column_type: ColumnType) -> Column {
        Column {
            name: "c".to_string(),
            table_name: "t".to_string(),
            raw_type: String::new(),
            column_type,
            length: None,
            decimals: None,
            is_nullable: true,
            is_primary_key: false,
            is_auto_increment: false,
            default: None,
            max_value: None,
        }
    }

    fn encode(column: &Column, value: SqlValue) -> String {
        let mut out = String::new();
        encode_value(column, &value, &mut out);
        out
    }

    #[test]
    fn test_boolean_is_never_null() {
        let col = column(ColumnType::Boolean);
        assert_eq!(encode(&col, SqlValue::Null), "f");
        assert_eq!(encode(&col, SqlValue::Int(0)), "f");
        assert_eq!(encode(&col, SqlValue::Int(1)), "t");
        assert_eq!(encode(&col, SqlValue::Int(7)), "t");
        assert_eq!(encode(&col, SqlValue::Bytes(vec![0])), "f");
        assert_eq!(encode(&col, SqlValue::Bytes(vec![1])), "t");
    }

    #[test]
    fn test_null_markers() {
        assert_eq!(encode(&column(ColumnType::Varchar), SqlValue::Null), "\\N");
        assert_eq!(encode(&column(ColumnType::Timestamp), SqlValue::Null), "\\N");

        let mut ts = column(ColumnType::Timestamp);
        ts.default = Some("CURRENT_TIMESTAMP".to_string());
        assert_eq!(encode(&ts, SqlValue::Null), EPOCH_TIMESTAMP);

        let mut date = column(ColumnType::Date);
        date.default = Some("2020-01-01".to_string());
        assert_eq!(encode(&date, SqlValue::Null), "\\N");
    }

    #[test]
    fn test_text_escaping_removes_nul() {
        let out = encode(
            &column(ColumnType::Text),
            SqlValue::Text("a\\b\nc\td\re\0f".to_string()),
        );
        assert_eq!(out, "a\\\\b\\nc\\td\\ref");
        assert!(!out.contains('\0'));
    }

    #[test]
    fn test_bytea_hex() {
        let out = encode(&column(ColumnType::Bytea), SqlValue::Bytes(vec![0xde, 0xad, 0x00]));
        assert_eq!(out, "\\\\xdead00");
    }

    #[test]
    fn test_bits_padded_to_width() {
        assert_eq!(encode(&column(ColumnType::Bit(8)), SqlValue::Bytes(vec![5])), "00000101");
        assert_eq!(
            encode(&column(ColumnType::Bit(10)), SqlValue::Bytes(vec![0x02, 0x01])),
            "1000000001"
        );
    }

    #[test]
    fn test_set_to_array() {
        let col = column(ColumnType::Set(vec!["a".into(), "b\"q".into()]));
        assert_eq!(encode(&col, SqlValue::Text("a,b\"q".into())), "{\"a\",\"b\\\\\"q\"}");
        assert_eq!(encode(&col, SqlValue::Text(String::new())), "{}");
    }

    #[test]
    fn test_temporal_formats() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(encode(&column(ColumnType::Date), SqlValue::Date(date)), "2024-02-29");

        let dt = date.and_hms_opt(13, 5, 9).unwrap();
        assert_eq!(
            encode(&column(ColumnType::DateTime), SqlValue::DateTime(dt)),
            "2024-02-29T13:05:09"
        );
        let precise = date.and_hms_micro_opt(13, 5, 9, 120).unwrap();
        assert_eq!(
            encode(&column(ColumnType::DateTime), SqlValue::DateTime(precise)),
            "2024-02-29T13:05:09.000120"
        );
    }

    #[test]
    fn test_time_wraps_to_time_of_day() {
        let col = column(ColumnType::Time);
        let t = TimeDelta::hours(26) + TimeDelta::minutes(3);
        assert_eq!(encode(&col, SqlValue::Time(t)), "02:03:00");
        assert_eq!(encode(&col, SqlValue::Time(TimeDelta::seconds(-1))), "23:59:59");
        assert_eq!(
            encode(&col, SqlValue::Time(TimeDelta::microseconds(1_500_000))),
            "00:00:01.500000"
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(encode(&column(ColumnType::BigInt), SqlValue::Int(-12)), "-12");
        assert_eq!(encode(&column(ColumnType::Numeric), SqlValue::UInt(u64::MAX)), "18446744073709551615");
        assert_eq!(encode(&column(ColumnType::Double), SqlValue::Double(1.5)), "1.5");
        assert_eq!(encode(&column(ColumnType::Numeric), SqlValue::Text("10.25".into())), "10.25");
    }

    #[test]
    fn test_encode_row() {
        let columns = vec![column(ColumnType::Integer), column(ColumnType::Varchar)];
        let mut out = String::new();
        encode_row(&columns, &[SqlValue::Int(1), SqlValue::Text("x\ty".into())], &mut out).unwrap();
        assert_eq!(out, "1\tx\\ty\n");
    }

    #[test]
    fn test_encode_row_width_mismatch() {
        let columns = vec![column(ColumnType::Integer)];
        let mut out = String::new();
        assert!(encode_row(&columns, &[], &mut out).is_err());
    }
}
