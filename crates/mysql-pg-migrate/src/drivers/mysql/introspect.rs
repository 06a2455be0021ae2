//! Parsing of MySQL column type spellings and `SHOW CREATE TABLE` output.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::core::schema::{ColumnType, ForeignKey, Index};
use crate::error::{MigrateError, Result};

static LENGTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+)\)").unwrap());

static PRECISION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+),\s*(\d+)\)").unwrap());

static FOREIGN_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"CONSTRAINT `([^`]+)` FOREIGN KEY \(([^)]+)\) REFERENCES `([^`]+)` \(([^)]+)\)")
        .unwrap()
});

static KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"KEY `([^`]+)` \((.*)\)").unwrap());

static PRIMARY_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"PRIMARY KEY \((.*)\)").unwrap());

static QUOTED_IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());

/// A source type spelling resolved into its category and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedType {
    pub column_type: ColumnType,
    pub length: Option<u32>,
    pub decimals: Option<u32>,
}

/// Resolve a type as reported by `EXPLAIN` (e.g. `int(10) unsigned`).
///
/// Returns `None` for types with no translation (spatial types and the like).
pub fn parse_column_type(raw: &str) -> Option<ParsedType> {
    let raw = raw.trim();
    let lower = raw.to_lowercase();
    let base = lower
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or("");
    let unsigned = lower.contains("unsigned");

    let (length, decimals) = match PRECISION_RE.captures(&lower) {
        Some(caps) => (caps[1].parse().ok(), caps[2].parse().ok()),
        None => (
            LENGTH_RE.captures(&lower).and_then(|caps| caps[1].parse().ok()),
            None,
        ),
    };

    let column_type = match base {
        "varchar" => ColumnType::Varchar,
        "char" => ColumnType::Char,
        "bool" | "boolean" => ColumnType::Boolean,
        "bit" | "tinyint" if length == Some(1) => ColumnType::Boolean,
        "bit" => ColumnType::Bit(length.unwrap_or(1)),
        "tinyint" | "year" => ColumnType::TinyInt,
        "smallint" if unsigned => ColumnType::Integer,
        "smallint" => ColumnType::TinyInt,
        "mediumint" => ColumnType::Integer,
        "int" | "integer" if unsigned => ColumnType::BigInt,
        "int" | "integer" => ColumnType::Integer,
        "bigint" if unsigned => ColumnType::Numeric,
        "bigint" => ColumnType::BigInt,
        "float" => ColumnType::Float,
        "decimal" | "numeric" | "dec" | "fixed" => ColumnType::Numeric,
        "double" | "real" => ColumnType::Double,
        "datetime" => ColumnType::DateTime,
        "timestamp" => ColumnType::Timestamp,
        "date" => ColumnType::Date,
        "time" => ColumnType::Time,
        "tinytext" | "text" | "mediumtext" | "longtext" | "json" => ColumnType::Text,
        "tinyblob" | "blob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
            ColumnType::Bytea
        }
        "enum" => ColumnType::Enum(parse_quoted_list(&raw[base.len()..])),
        "set" => ColumnType::Set(parse_quoted_list(&raw[base.len()..])),
        _ => return None,
    };

    Some(ParsedType {
        column_type,
        length,
        decimals,
    })
}

/// Parse `('a','it''s','c')` into its unquoted members.
fn parse_quoted_list(s: &str) -> Vec<String> {
    let mut members = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\'' {
            continue;
        }
        let mut member = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\'' if chars.peek() == Some(&'\'') => {
                    chars.next();
                    member.push('\'');
                }
                '\'' => break,
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        member.push(escaped);
                    }
                }
                c => member.push(c),
            }
        }
        members.push(member);
    }
    members
}

/// Indexes and foreign keys recovered from a `SHOW CREATE TABLE` statement.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TableKeys {
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
}

/// Leading words of the lines in `SHOW CREATE TABLE` that define keys.
const KEY_LINE_PREFIXES: [&str; 6] = [
    "PRIMARY KEY",
    "UNIQUE KEY",
    "KEY",
    "FULLTEXT KEY",
    "SPATIAL KEY",
    "CONSTRAINT",
];

/// Recover keys from `SHOW CREATE TABLE` output, one definition per line.
///
/// Only key definition lines are considered. Each is tried as a foreign key
/// constraint, a named (optionally unique) key and the primary key, in that
/// order; constraints of other kinds (`CHECK`) are skipped.
pub fn parse_create_table(table: &str, ddl: &str) -> Result<TableKeys> {
    let mut keys = TableKeys::default();

    for line in ddl.lines().map(str::trim).filter(|l| is_key_line(l)) {
        if let Some(caps) = FOREIGN_KEY_RE.captures(line) {
            let columns = quoted_idents(&caps[2]);
            let ref_columns = quoted_idents(&caps[4]);
            if columns.is_empty() || columns.len() != ref_columns.len() {
                return Err(MigrateError::schema(
                    table,
                    format!("malformed foreign key: {}", line),
                ));
            }
            keys.foreign_keys.push(ForeignKey {
                name: caps[1].to_string(),
                columns,
                ref_table: caps[3].to_string(),
                ref_columns,
            });
        } else if let Some(caps) = KEY_RE.captures(line) {
            keys.indexes.push(Index {
                name: caps[1].to_string(),
                columns: non_empty(table, line, quoted_idents(&caps[2]))?,
                is_unique: line.starts_with("UNIQUE"),
                is_primary: false,
            });
        } else if let Some(caps) = PRIMARY_KEY_RE.captures(line) {
            keys.indexes.push(Index {
                name: "PRIMARY".to_string(),
                columns: non_empty(table, line, quoted_idents(&caps[1]))?,
                is_unique: true,
                is_primary: true,
            });
        } else {
            debug!("{}: skipping constraint {}", table, line);
        }
    }

    Ok(keys)
}

fn is_key_line(line: &str) -> bool {
    KEY_LINE_PREFIXES.iter().any(|prefix| {
        line.strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with(' ') || rest.starts_with('('))
    })
}

// Backquoted names in a key column list; prefix lengths like `(20)` fall away.
fn quoted_idents(list: &str) -> Vec<String> {
    QUOTED_IDENT_RE
        .captures_iter(list)
        .map(|caps| caps[1].to_string())
        .collect()
}

fn non_empty(table: &str, line: &str, columns: Vec<String>) -> Result<Vec<String>> {
    if columns.is_empty() {
        return Err(MigrateError::schema(
            table,
            format!("key without columns: {}", line.trim()),
        ));
    }
    Ok(columns)
}
