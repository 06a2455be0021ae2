//! Column type translation from MySQL to PostgreSQL.
//!
//! Each normalized [`ColumnType`] maps to a PostgreSQL type, an optional
//! default clause and, for enums, a check constraint. The mapping is pure:
//! translating the same column twice yields identical text.

use std::fmt;

use crate::core::identifier::{quote_literal, quote_pg};
use crate::core::schema::{Column, ColumnType};

/// Default precision for numeric columns declared without one.
const DEFAULT_NUMERIC_PRECISION: u32 = 20;

/// Literal MySQL writes for an unset datetime, and its PostgreSQL replacement.
const ZERO_DATETIME_DEFAULTS: [(&str, &str); 2] = [
    ("0000-00-00 00:00", "1970-01-01 00:00"),
    ("0000-00-00 00:00:00", "1970-01-01 00:00:00"),
];

/// Translated column definition, minus the column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// PostgreSQL type, e.g. `character varying(50)`.
    pub sql_type: String,
    /// Default expression, already quoted and cast where needed.
    pub default: Option<String>,
    /// Whether the column is declared NOT NULL.
    pub not_null: bool,
    /// Column check constraint expression.
    pub check: Option<String>,
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_type)?;
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {}", default)?;
        }
        if self.not_null {
            f.write_str(" NOT NULL")?;
        }
        if let Some(check) = &self.check {
            write!(f, " CHECK ({})", check)?;
        }
        Ok(())
    }
}

/// Translate a column into its PostgreSQL type, default and constraints.
pub fn column_type_info(column: &Column) -> TypeInfo {
    if column.is_auto_increment {
        let seq = quote_literal(&quote_pg(&column.sequence_name()));
        return TypeInfo {
            sql_type: "integer".to_string(),
            default: Some(format!("nextval({}::regclass)", seq)),
            not_null: true,
            check: None,
        };
    }

    let default = column.default.as_deref();
    let quoted = || default.map(quote_literal);
    let raw = || default.map(str::to_string);
    let mut check = None;

    let (sql_type, default) = match &column.column_type {
        ColumnType::Char => (
            sized("character", column.length),
            quoted().map(|d| format!("{}::bpchar", d)),
        ),
        ColumnType::Varchar => (
            sized("character varying", column.length),
            quoted().map(|d| format!("{}::character varying", d)),
        ),
        ColumnType::Boolean => (
            "boolean".to_string(),
            default.map(|d| boolean_default(d).to_string()),
        ),
        ColumnType::TinyInt => ("smallint".to_string(), raw()),
        ColumnType::Integer => ("integer".to_string(), raw()),
        ColumnType::BigInt => ("bigint".to_string(), raw()),
        ColumnType::Numeric => (
            format!(
                "numeric({}, {})",
                column.length.unwrap_or(DEFAULT_NUMERIC_PRECISION),
                column.decimals.unwrap_or(0)
            ),
            raw(),
        ),
        ColumnType::Float => ("real".to_string(), raw()),
        ColumnType::Double => ("double precision".to_string(), raw()),
        ColumnType::DateTime | ColumnType::Timestamp => (
            "timestamp without time zone".to_string(),
            default.and_then(temporal_default),
        ),
        ColumnType::Date => ("date".to_string(), default.and_then(temporal_default)),
        ColumnType::Time => ("time without time zone".to_string(), quoted()),
        ColumnType::Text => ("text".to_string(), quoted()),
        ColumnType::Bytea => ("bytea".to_string(), quoted()),
        ColumnType::Enum(labels) => {
            let width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(1);
            let members: Vec<String> = labels.iter().map(|l| quote_literal(l)).collect();
            check = Some(format!("{} IN ({})", quote_pg(&column.name), members.join(", ")));
            (
                format!("character varying({})", width),
                quoted().map(|d| format!("{}::character varying", d)),
            )
        }
        ColumnType::Bit(width) => (
            format!("bit varying({})", width),
            default.map(str::to_uppercase),
        ),
        ColumnType::Set(_) => ("text[]".to_string(), default.map(set_default)),
    };

    TypeInfo {
        sql_type,
        default,
        not_null: !column.is_nullable,
        check,
    }
}

/// PostgreSQL type name for a column, without default or constraints.
pub fn column_type(column: &Column) -> String {
    column_type_info(column).sql_type
}

/// Full column definition line for CREATE TABLE.
pub fn column_description(column: &Column) -> String {
    format!("{} {}", quote_pg(&column.name), column_type_info(column))
}

fn sized(base: &str, length: Option<u32>) -> String {
    match length {
        Some(len) => format!("{}({})", base, len),
        None => base.to_string(),
    }
}

fn boolean_default(default: &str) -> bool {
    matches!(default.trim(), "1" | "b'1'" | "true" | "TRUE")
}

// Only CURRENT_TIMESTAMP and the zero-date sentinels survive; other literal
// defaults on temporal columns are dropped.
fn temporal_default(default: &str) -> Option<String> {
    if default.to_uppercase().starts_with("CURRENT_TIMESTAMP") {
        return Some("CURRENT_TIMESTAMP".to_string());
    }
    ZERO_DATETIME_DEFAULTS
        .iter()
        .find(|(zero, _)| *zero == default)
        .map(|(_, epoch)| quote_literal(epoch))
}

fn set_default(default: &str) -> String {
    let members: Vec<String> = if default.is_empty() {
        Vec::new()
    } else {
        default.split(',').map(quote_literal).collect()
    };
    format!("ARRAY[{}]::text[]", members.join(", "))
}
