//! Configuration validation.

use tracing::warn;

use super::Config;
use crate::drivers::common::SslMode;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.mysql.database.is_empty() {
        return Err(MigrateError::Config("mysql.database is required".into()));
    }
    if config.mysql.username.is_empty() {
        return Err(MigrateError::Config("mysql.username is required".into()));
    }
    if config.mysql.socket.is_none() && config.mysql.hostname.is_empty() {
        return Err(MigrateError::Config(
            "mysql.hostname or mysql.socket is required".into(),
        ));
    }

    // Destination validation
    if config.destination.file.is_none() {
        let Some(pg) = &config.destination.postgres else {
            return Err(MigrateError::Config(
                "destination.file or destination.postgres is required".into(),
            ));
        };
        if pg.hostname.is_empty() {
            return Err(MigrateError::Config(
                "destination.postgres.hostname is required".into(),
            ));
        }
        if pg.username.is_empty() {
            return Err(MigrateError::Config(
                "destination.postgres.username is required".into(),
            ));
        }
        if pg.dbname().is_empty() {
            return Err(MigrateError::Config(
                "destination.postgres.database is required".into(),
            ));
        }
        if pg.schema() == Some("") {
            return Err(MigrateError::Config(format!(
                "destination.postgres.database '{}' has an empty schema after ':'",
                pg.database
            )));
        }
        SslMode::parse(&pg.ssl_mode)?;
    }

    // Table filters
    if config.only_tables.iter().any(|t| t.is_empty()) {
        return Err(MigrateError::Config(
            "only_tables must not contain empty names".into(),
        ));
    }
    if config.exclude_tables.iter().any(|t| t.is_empty()) {
        return Err(MigrateError::Config(
            "exclude_tables must not contain empty names".into(),
        ));
    }
    if !config.only_tables.is_empty() && !config.exclude_tables.is_empty() {
        warn!("only_tables is set; exclude_tables will be ignored");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DestinationConfig, MysqlConfig, PostgresConfig};
    use std::path::PathBuf;

    fn valid_config() -> Config {
        Config {
            mysql: MysqlConfig {
                hostname: "localhost".to_string(),
                port: 3306,
                socket: None,
                username: "root".to_string(),
                password: Some("secret".to_string()),
                database: "shop".to_string(),
                compress: true,
            },
            destination: DestinationConfig {
                file: None,
                postgres: Some(PostgresConfig {
                    hostname: "localhost".to_string(),
                    port: 5432,
                    username: "postgres".to_string(),
                    password: Some("secret".to_string()),
                    database: "shop".to_string(),
                    ssl_mode: "disable".to_string(),
                }),
            },
            only_tables: vec![],
            exclude_tables: vec![],
            suppress_data: false,
            suppress_ddl: false,
            force_truncate: false,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_mysql_database() {
        let mut config = valid_config();
        config.mysql.database = String::new();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("mysql.database"));
    }

    #[test]
    fn test_missing_destination() {
        let mut config = valid_config();
        config.destination.postgres = None;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_file_destination_needs_no_postgres() {
        let mut config = valid_config();
        config.destination.postgres = None;
        config.destination.file = Some(PathBuf::from("dump.sql"));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_schema_rejected() {
        let mut config = valid_config();
        config.destination.postgres.as_mut().unwrap().database = "shop:".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let mut config = valid_config();
        config.destination.postgres.as_mut().unwrap().ssl_mode = "sometimes".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("ssl_mode"));
    }

    #[test]
    fn test_empty_table_name_rejected() {
        let mut config = valid_config();
        config.only_tables = vec!["users".to_string(), String::new()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let config = valid_config();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
