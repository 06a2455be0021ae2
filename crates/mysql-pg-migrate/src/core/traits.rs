//! Core traits for reading from the source and writing to a destination.
//!
//! - [`SourceReader`]: enumerates tables, introspects them and streams rows
//! - [`TargetWriter`]: applies DDL and bulk-loads data, either into a live
//!   database or into a SQL script
//!
//! The orchestrator only talks to these traits, so the introspection strategy
//! and the destination can change without touching the conversion sequence.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

use super::schema::Table;
use super::value::Row;

/// Lazy, forward-only stream of rows borrowed from a reader.
pub type RowStream<'a> = BoxStream<'a, Result<Row>>;

/// Read schema and data from a source database.
#[async_trait]
pub trait SourceReader: Send {
    /// Names of all tables in the source database, in the source's natural order.
    async fn list_tables(&mut self) -> Result<Vec<String>>;

    /// Introspect a table: columns, indexes and foreign keys.
    async fn load_table(&mut self, name: &str) -> Result<Table>;

    /// Stream every row of a table in column order.
    ///
    /// The stream must not buffer the whole result set; rows are pulled from
    /// the server as the consumer asks for them.
    async fn read<'a>(&'a mut self, table: &Table) -> Result<RowStream<'a>>;

    /// Release the source connection.
    async fn close(&mut self) -> Result<()>;
}

/// Write converted schema and data to a destination.
///
/// Calls arrive in a fixed order per run: `write_table` for every table,
/// then `truncate` or `write_contents`, then `write_indexes` and finally
/// `write_constraints`.
#[async_trait]
pub trait TargetWriter: Send {
    /// Create sequences and the table itself.
    async fn write_table(&mut self, table: &Table) -> Result<()>;

    /// Create the primary key constraint and secondary indexes.
    async fn write_indexes(&mut self, table: &Table) -> Result<()>;

    /// Add foreign key constraints.
    async fn write_constraints(&mut self, table: &Table) -> Result<()>;

    /// Empty an existing table and reset its sequences.
    async fn truncate(&mut self, table: &Table) -> Result<()>;

    /// Copy all rows of `table` from `reader`, returning the number of rows written.
    async fn write_contents(&mut self, table: &Table, reader: &mut dyn SourceReader)
        -> Result<u64>;

    /// Flush and release the destination.
    async fn close(&mut self) -> Result<()>;
}
