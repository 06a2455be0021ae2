//! Live PostgreSQL target writer.
//!
//! Executes each DDL statement on its own (autocommit) and loads rows through
//! the COPY protocol. Failures are returned immediately; nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio_postgres::{Client, Config as PgConfig, NoTls};
use tracing::{debug, error, info, warn};

use crate::config::PostgresConfig;
use crate::core::schema::Table;
use crate::core::traits::{SourceReader, TargetWriter};
use crate::dialect::{self, SESSION_SETTINGS};
use crate::drivers::common::{tls_connector, SslMode};
use crate::error::{MigrateError, Result};
use crate::transfer::{copy_lines, copy_statement, ProgressMeter};

/// Connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// COPY data is sent to the server in chunks of about this size.
const COPY_CHUNK_BYTES: usize = 64 * 1024;

/// PostgreSQL target writer implementation.
pub struct PostgresWriter {
    client: Client,
    verbose: bool,
}

impl PostgresWriter {
    /// Connect to the target and prepare the session.
    pub async fn connect(config: &PostgresConfig, verbose: bool) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config
            .host(&config.hostname)
            .port(config.port)
            .dbname(config.dbname())
            .user(&config.username)
            .keepalives(true)
            .connect_timeout(CONNECT_TIMEOUT);
        if let Some(password) = &config.password {
            pg_config.password(password);
        }

        let context = format!(
            "connecting to PostgreSQL target {}:{}/{}",
            config.hostname,
            config.port,
            config.dbname()
        );
        let client = match tls_connector(SslMode::parse(&config.ssl_mode)?)? {
            Some(tls) => {
                let (client, connection) = pg_config
                    .connect(tls)
                    .await
                    .map_err(|e| MigrateError::connection(e, &context))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("PostgreSQL connection error: {}", e);
                    }
                });
                client
            }
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let (client, connection) = pg_config
                    .connect(NoTls)
                    .await
                    .map_err(|e| MigrateError::connection(e, &context))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("PostgreSQL connection error: {}", e);
                    }
                });
                client
            }
        };

        info!(
            "Connected to PostgreSQL target: {}:{}/{}",
            config.hostname,
            config.port,
            config.database
        );

        let writer = Self { client, verbose };
        if let Some(schema) = config.schema() {
            writer.execute(&dialect::set_search_path(schema)).await?;
        }
        for setting in SESSION_SETTINGS {
            writer.execute(setting).await?;
        }
        Ok(writer)
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        debug!("{}", sql);
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    async fn execute_all<'s>(&self, statements: impl IntoIterator<Item = &'s String>) -> Result<()> {
        for sql in statements {
            self.execute(sql).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TargetWriter for PostgresWriter {
    async fn write_table(&mut self, table: &Table) -> Result<()> {
        let ddl = dialect::write_table(table);
        self.execute_all(ddl.statements()).await
    }

    async fn write_indexes(&mut self, table: &Table) -> Result<()> {
        self.execute_all(&dialect::write_indexes(table)).await
    }

    async fn write_constraints(&mut self, table: &Table) -> Result<()> {
        self.execute_all(&dialect::write_constraints(table)).await
    }

    async fn truncate(&mut self, table: &Table) -> Result<()> {
        self.execute_all(&dialect::truncate(table)).await
    }

    async fn write_contents(
        &mut self,
        table: &Table,
        reader: &mut dyn SourceReader,
    ) -> Result<u64> {
        let rows = reader.read(table).await?;
        let mut lines = copy_lines(table, rows);

        let copy_sql = copy_statement(table);
        debug!("{}", copy_sql);
        let sink = self
            .client
            .copy_in::<_, Bytes>(&copy_sql)
            .await
            .map_err(|e| MigrateError::transfer(&table.name, format!("initiating COPY: {}", e)))?;
        tokio::pin!(sink);

        let mut progress = ProgressMeter::new(&table.name, self.verbose);
        let mut buf = BytesMut::with_capacity(COPY_CHUNK_BYTES);
        while let Some(line) = lines.next().await {
            buf.put_slice(line?.as_bytes());
            progress.tick();
            if buf.len() >= COPY_CHUNK_BYTES {
                sink.send(buf.split().freeze()).await.map_err(|e| {
                    MigrateError::transfer(&table.name, format!("sending COPY data: {}", e))
                })?;
            }
        }
        if !buf.is_empty() {
            sink.send(buf.freeze()).await.map_err(|e| {
                MigrateError::transfer(&table.name, format!("sending COPY data: {}", e))
            })?;
        }

        let copied = sink
            .finish()
            .await
            .map_err(|e| MigrateError::transfer(&table.name, format!("finishing COPY: {}", e)))?;
        debug!("{}: server reported {} rows", table.name, copied);
        Ok(progress.finish())
    }

    async fn close(&mut self) -> Result<()> {
        // The connection task ends once the client is dropped.
        Ok(())
    }
}
