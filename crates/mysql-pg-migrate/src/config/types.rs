//! Configuration type definitions.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database (MySQL) connection.
    pub mysql: MysqlConfig,

    /// Where the converted schema and data go.
    pub destination: DestinationConfig,

    /// Only convert these tables, in this order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub only_tables: Vec<String>,

    /// Skip these tables. Ignored when `only_tables` is non-empty.
    #[serde(default, deserialize_with = "null_as_default")]
    pub exclude_tables: Vec<String>,

    /// Skip data and only convert the schema.
    #[serde(default, rename = "supress_data", alias = "suppress_data")]
    pub suppress_data: bool,

    /// Skip schema creation, indexes and constraints.
    #[serde(default, rename = "supress_ddl", alias = "suppress_ddl")]
    pub suppress_ddl: bool,

    /// Truncate existing tables before loading data (only with `supress_ddl`).
    #[serde(default)]
    pub force_truncate: bool,
}

/// Source database (MySQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct MysqlConfig {
    /// Database host (default: localhost).
    #[serde(default = "default_localhost")]
    pub hostname: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Unix domain socket. Takes precedence over hostname/port when set.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub socket: Option<String>,

    /// Username (default: root).
    #[serde(default = "default_mysql_user")]
    pub username: String,

    /// Password.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub password: Option<String>,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// Protocol compression for TCP connections (default: true).
    #[serde(default = "default_true")]
    pub compress: bool,
}

/// Destination configuration: a dump file or a live PostgreSQL database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Write a SQL script to this path instead of a live database.
    #[serde(default, deserialize_with = "empty_path_as_none")]
    pub file: Option<PathBuf>,

    /// Live PostgreSQL target.
    #[serde(default)]
    pub postgres: Option<PostgresConfig>,
}

/// Resolved destination, file taking precedence over a live database.
#[derive(Debug, Clone, Copy)]
pub enum Destination<'a> {
    File(&'a Path),
    Postgres(&'a PostgresConfig),
}

impl DestinationConfig {
    /// Resolve which destination the run writes to.
    pub fn resolve(&self) -> Option<Destination<'_>> {
        match (&self.file, &self.postgres) {
            (Some(path), _) => Some(Destination::File(path)),
            (None, Some(pg)) => Some(Destination::Postgres(pg)),
            (None, None) => None,
        }
    }
}

/// Target database (PostgreSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Database host (default: localhost).
    #[serde(default = "default_localhost")]
    pub hostname: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Username (default: postgres).
    #[serde(default = "default_pg_user")]
    pub username: String,

    /// Password.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub password: Option<String>,

    /// Database name, optionally with a target schema as `db:schema`.
    #[serde(default)]
    pub database: String,

    /// SSL mode (default: "disable").
    #[serde(default = "default_disable")]
    pub ssl_mode: String,
}

impl PostgresConfig {
    /// Database name without any `:schema` suffix.
    pub fn dbname(&self) -> &str {
        self.split_database().0
    }

    /// Target schema from a `db:schema` database value.
    pub fn schema(&self) -> Option<&str> {
        self.split_database().1
    }

    fn split_database(&self) -> (&str, Option<&str>) {
        match self.database.split_once(':') {
            Some((db, schema)) => (db, Some(schema)),
            None => (&self.database, None),
        }
    }
}

impl fmt::Debug for MysqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlConfig")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("socket", &self.socket)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .field("compress", &self.compress)
            .finish()
    }
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

// YAML keys written without a value (`password:`) deserialize as null.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn empty_path_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(empty_as_none(deserializer)?.map(PathBuf::from))
}

fn default_localhost() -> String {
    "localhost".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_pg_port() -> u16 {
    5432
}

fn default_mysql_user() -> String {
    "root".to_string()
}

fn default_pg_user() -> String {
    "postgres".to_string()
}

fn default_disable() -> String {
    "disable".to_string()
}

fn default_true() -> bool {
    true
}
