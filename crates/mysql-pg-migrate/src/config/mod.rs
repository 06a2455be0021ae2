//! Configuration loading, validation and first-run template generation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use tracing::info;

use crate::error::{MigrateError, Result};

/// Template written when no configuration file exists yet.
pub const CONFIG_TEMPLATE: &str = r#"# If a socket is specified it is used instead of hostname/port.
mysql:
  hostname: localhost
  port: 3306
  socket: /tmp/mysql.sock
  username: mysql2psql
  password:
  database: mysql2psql_test
  compress: false

destination:
  # If file is given, output is written to it as a SQL script and
  # the postgres section is ignored.
  file:
  postgres:
    hostname: localhost
    port: 5432
    username: mysql2psql
    password:
    # Use "database:schema" to load into a schema other than public.
    database: mysql2psql_test
    # disable, require, verify-ca or verify-full
    ssl_mode: disable

# If only_tables is given, only the listed tables are converted, in this order.
#only_tables:
#- table1
#- table2

# If exclude_tables is given, those tables are skipped.
#exclude_tables:
#- table3
#- table4

# If supress_data is true, only the schema definition is exported/migrated.
supress_data: false

# If supress_ddl is true, only the data is exported/migrated.
supress_ddl: false

# With supress_ddl, truncate the target tables before loading data.
force_truncate: false
"#;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load configuration, writing a template first if the file is missing.
    ///
    /// A missing file yields [`MigrateError::ConfigInitialized`] after the template
    /// has been written, or [`MigrateError::ConfigNotFound`] when `generate` is false.
    pub fn load_or_init<P: AsRef<Path>>(path: P, generate: bool) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            if !generate {
                return Err(MigrateError::ConfigNotFound(path.to_path_buf()));
            }
            std::fs::write(path, CONFIG_TEMPLATE)?;
            info!("Wrote configuration template to {}", path.display());
            return Err(MigrateError::ConfigInitialized(path.to_path_buf()));
        }
        Self::load(path)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}
