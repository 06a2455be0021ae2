//! Helpers shared across drivers.
//!
//! - [`tls`]: TLS configuration for the PostgreSQL connection

pub mod tls;

pub use tls::{tls_connector, SslMode};
