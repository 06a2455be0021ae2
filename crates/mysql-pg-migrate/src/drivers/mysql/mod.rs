//! MySQL source driver.
//!
//! - [`MysqlReader`]: connection handling, introspection and row streaming
//! - [`introspect`]: type spelling and `SHOW CREATE TABLE` parsing
//!
//! Supports MySQL 5.7+ and 8.0+, and MariaDB 10.2+.

pub mod introspect;
mod reader;

pub use reader::{select_sql, MysqlReader};
