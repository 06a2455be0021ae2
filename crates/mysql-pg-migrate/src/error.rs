//! Error types for the conversion library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for conversion operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// The configuration file was missing and a template has just been written.
    ///
    /// Not a failure as such: the operator is expected to edit the file and re-run.
    #[error(
        "No configuration file found.\nA new file has been initialized at: {}\nPlease review the configuration and retry...",
        .0.display()
    )]
    ConfigInitialized(PathBuf),

    /// The configuration file was missing and template generation was disabled.
    #[error("Cannot load config file {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Configuration error (invalid values, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source database connection or query error
    #[error("Source database error: {0}")]
    Source(#[from] mysql_async::Error),

    /// Target database connection or query error
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// Connection error with context
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Table definition could not be parsed
    #[error("Schema introspection failed for table {table}: {message}")]
    SchemaParse { table: String, message: String },

    /// Source column type with no PostgreSQL translation
    #[error("Unsupported type '{data_type}' for column {table}.{column}")]
    UnsupportedType {
        table: String,
        column: String,
        data_type: String,
    },

    /// Data transfer failed for a specific table
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        MigrateError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a SchemaParse error
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::SchemaParse {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    ///
    /// | code | meaning |
    /// |------|---------|
    /// | 1 | invalid configuration |
    /// | 2 | configuration template written |
    /// | 3 | source database |
    /// | 4 | target database |
    /// | 5 | schema introspection or unsupported type |
    /// | 6 | data transfer |
    /// | 7 | configuration file missing or other I/O |
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) | MigrateError::Json(_) => 1,
            MigrateError::ConfigInitialized(_) => 2,
            MigrateError::Source(_) | MigrateError::Connection { .. } => 3,
            MigrateError::Target(_) => 4,
            MigrateError::SchemaParse { .. } | MigrateError::UnsupportedType { .. } => 5,
            MigrateError::Transfer { .. } => 6,
            MigrateError::ConfigNotFound(_) | MigrateError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_for_config_signals() {
        let init = MigrateError::ConfigInitialized(PathBuf::from("a.yml"));
        let missing = MigrateError::ConfigNotFound(PathBuf::from("a.yml"));
        assert_eq!(init.exit_code(), 2);
        assert_eq!(missing.exit_code(), 7);
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_initialized_message_names_path() {
        let err = MigrateError::ConfigInitialized(PathBuf::from("/tmp/conv.yml"));
        let msg = err.to_string();
        assert!(msg.contains("A new file has been initialized at: /tmp/conv.yml"));
    }

    #[test]
    fn test_format_detailed_includes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = MigrateError::from(io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: IO error: denied"));
    }
}
