//! Core abstractions shared by the reader, translator and writers.
//!
//! - [`schema`]: table, column, index and foreign key metadata
//! - [`value`]: row values as read from the source
//! - [`traits`]: source reader and target writer contracts
//! - [`identifier`]: identifier and literal quoting

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{Column, ColumnType, ForeignKey, Index, Table};
pub use traits::{RowStream, SourceReader, TargetWriter};
pub use value::{Row, SqlValue};
