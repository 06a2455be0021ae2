//! Schema metadata types for tables, columns, indexes and foreign keys.
//!
//! A [`Table`] is built once per source table by the reader and stays
//! immutable for the rest of the run.

/// Normalized column type category.
///
/// Every source type spelling collapses into exactly one of these. The
/// translator and the row normalizer both match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Char,
    Varchar,
    Boolean,
    /// Small integers (tinyint, signed smallint, year).
    TinyInt,
    Integer,
    BigInt,
    /// Exact decimals, and unsigned bigint which overflows PostgreSQL bigint.
    Numeric,
    Float,
    Double,
    DateTime,
    Timestamp,
    Date,
    Time,
    Text,
    Bytea,
    /// Enumeration with its labels in declaration order.
    Enum(Vec<String>),
    /// Bit string of the given width (widths other than 1).
    Bit(u32),
    /// Set with its allowed members in declaration order.
    Set(Vec<String>),
}

impl ColumnType {
    /// True for datetime and timestamp columns.
    pub fn is_timestamp(&self) -> bool {
        matches!(self, ColumnType::DateTime | ColumnType::Timestamp)
    }

    /// Short category name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Char => "char",
            ColumnType::Varchar => "varchar",
            ColumnType::Boolean => "boolean",
            ColumnType::TinyInt => "tinyint",
            ColumnType::Integer => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::Numeric => "numeric",
            ColumnType::Float => "float",
            ColumnType::Double => "double precision",
            ColumnType::DateTime => "datetime",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Text => "text",
            ColumnType::Bytea => "bytea",
            ColumnType::Enum(_) => "enum",
            ColumnType::Bit(_) => "bit",
            ColumnType::Set(_) => "set",
        }
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Owning table name.
    pub table_name: String,

    /// Type exactly as the source reported it (e.g. `int(10) unsigned`).
    pub raw_type: String,

    /// Normalized type category.
    pub column_type: ColumnType,

    /// Declared length or precision.
    pub length: Option<u32>,

    /// Declared decimal scale.
    pub decimals: Option<u32>,

    /// Whether the column accepts NULL.
    pub is_nullable: bool,

    /// Whether the column is part of the primary key.
    pub is_primary_key: bool,

    /// Whether values come from an auto-increment counter.
    pub is_auto_increment: bool,

    /// Default value as reported by the source, unquoted.
    pub default: Option<String>,

    /// Largest existing value, for auto-increment columns (0 when the table is empty).
    pub max_value: Option<i64>,
}

impl Column {
    /// Name of the PostgreSQL sequence backing an auto-increment column.
    pub fn sequence_name(&self) -> String {
        format!("{}_{}_seq", self.table_name, self.name)
    }
}

/// Index metadata. A primary key is an index with `is_primary` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// Index name (`PRIMARY` for primary keys).
    pub name: String,

    /// Indexed columns in key order.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    pub is_unique: bool,

    /// Whether this is the primary key.
    pub is_primary: bool,
}

/// Foreign key constraint metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,

    /// Referencing columns.
    pub columns: Vec<String>,

    /// Referenced table.
    pub ref_table: String,

    /// Referenced columns, parallel to `columns`.
    pub ref_columns: Vec<String>,
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Column definitions in source order.
    pub columns: Vec<Column>,

    /// Primary key and secondary indexes.
    pub indexes: Vec<Index>,

    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Create an empty table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Column names in source order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// The primary key, if the table has one.
    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.is_primary)
    }

    /// Indexes other than the primary key.
    pub fn secondary_indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.iter().filter(|i| !i.is_primary)
    }

    /// Columns backed by an auto-increment counter.
    pub fn auto_increment_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_auto_increment)
    }
}
