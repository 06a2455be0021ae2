//! # mysql-pg-migrate
//!
//! MySQL to PostgreSQL schema and data conversion library.
//!
//! This library reads table definitions and rows from a MySQL database and
//! either replays them against a live PostgreSQL database or writes a SQL
//! script that `psql` can load later:
//!
//! - **Schema translation** of columns, defaults, sequences, indexes and foreign keys
//! - **Bulk loading** through the PostgreSQL COPY text format
//! - **Table filtering** with include and exclude lists
//! - **Reload mode** that truncates existing tables instead of recreating them
//!
//! ## Example
//!
//! ```rust,no_run
//! use mysql_pg_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> mysql_pg_migrate::Result<()> {
//!     let config = Config::load("mysql-pg-migrate.yml")?;
//!     let result = Orchestrator::new(config).run().await?;
//!     println!("Copied {} rows", result.rows_transferred);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod transfer;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, DestinationConfig, MysqlConfig, PostgresConfig};
pub use crate::core::{Column, ColumnType, ForeignKey, Index, Row, SqlValue, Table};
pub use crate::core::{SourceReader, TargetWriter};
pub use drivers::{FileWriter, MysqlReader, PostgresWriter, SslMode};
pub use error::{MigrateError, Result};
pub use orchestrator::{ConversionResult, ConvertOptions, Converter, Orchestrator};
