//! Database driver implementations.
//!
//! - [`mysql`]: source reader (introspection and row streaming)
//! - [`postgres`]: destinations (live database and SQL script)
//! - [`common`]: shared utilities (TLS)

pub mod common;
pub mod mysql;
pub mod postgres;

pub use common::{tls_connector, SslMode};
pub use mysql::MysqlReader;
pub use postgres::{FileWriter, PostgresWriter};
