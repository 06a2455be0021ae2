//! PostgreSQL destinations.
//!
//! - [`PostgresWriter`]: live database, DDL per statement and COPY for data
//! - [`FileWriter`]: SQL script with inline COPY blocks

mod dump;
mod writer;

pub use dump::FileWriter;
pub use writer::PostgresWriter;
