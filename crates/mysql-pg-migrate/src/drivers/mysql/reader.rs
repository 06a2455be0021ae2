//! MySQL source reader.
//!
//! Owns a single connection. Metadata queries that fail because the
//! connection dropped are retried once on a fresh connection; row streams
//! check the connection before starting. A second failure is returned.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta};
use futures::StreamExt;
use mysql_async::prelude::{FromRow, Queryable};
use mysql_async::{Compression, Conn, DriverError, Opts, OptsBuilder, Value};
use tracing::{debug, info, warn};

use super::introspect::{parse_column_type, parse_create_table};
use crate::config::MysqlConfig;
use crate::core::identifier::quote_mysql;
use crate::core::schema::{Column, ColumnType, Table};
use crate::core::traits::{RowStream, SourceReader};
use crate::core::value::{Row, SqlValue};
use crate::error::{MigrateError, Result};

/// MySQL client error codes for a connection that went away.
const CR_SERVER_GONE_ERROR: u16 = 2006;
const CR_SERVER_LOST: u16 = 2013;
const ER_CLIENT_INTERACTION_TIMEOUT: u16 = 4031;

/// MySQL source reader implementation.
pub struct MysqlReader {
    opts: Opts,
    endpoint: String,
    conn: Option<Conn>,
}

impl MysqlReader {
    /// Create a reader without connecting yet.
    pub fn new(config: &MysqlConfig) -> Self {
        let mut builder = OptsBuilder::default()
            .user(Some(&config.username))
            .pass(config.password.as_deref())
            .db_name(Some(&config.database))
            .init(vec!["SET NAMES utf8mb4"]);

        let endpoint = match &config.socket {
            Some(socket) => {
                builder = builder.socket(Some(socket));
                format!("{}/{}", socket, config.database)
            }
            None => {
                builder = builder
                    .ip_or_hostname(&config.hostname)
                    .tcp_port(config.port);
                if config.compress {
                    builder = builder.compression(Compression::fast());
                }
                format!("{}:{}/{}", config.hostname, config.port, config.database)
            }
        };

        Self {
            opts: builder.into(),
            endpoint,
            conn: None,
        }
    }

    /// Create a reader and open its connection.
    pub async fn connect(config: &MysqlConfig) -> Result<Self> {
        let mut reader = Self::new(config);
        reader.replace_connection().await?;
        info!("Connected to MySQL source: {}", reader.endpoint);
        Ok(reader)
    }

    /// Replace the current connection with a fresh one.
    async fn replace_connection(&mut self) -> Result<()> {
        if let Some(old) = self.conn.take() {
            if let Err(e) = old.disconnect().await {
                debug!("Discarding MySQL connection: {}", e);
            }
        }
        let conn = Conn::new(self.opts.clone())
            .await
            .map_err(|e| MigrateError::connection(e, format!("connecting to MySQL source {}", self.endpoint)))?;
        self.conn = Some(conn);
        Ok(())
    }

    async fn conn(&mut self) -> Result<&mut Conn> {
        if self.conn.is_none() {
            self.replace_connection().await?;
        }
        self.conn
            .as_mut()
            .ok_or_else(|| MigrateError::connection("no connection", "MySQL source"))
    }

    async fn query<T>(&mut self, sql: &str) -> Result<Vec<T>>
    where
        T: FromRow + Send + 'static,
    {
        debug!("{}", sql);
        query_with_retry(self, sql, is_connection_lost).await
    }

    async fn load_columns(&mut self, table: &str) -> Result<Vec<Column>> {
        let sql = format!("EXPLAIN {}", quote_mysql(table));
        let rows: Vec<(String, String, String, Option<String>, Option<String>, String)> =
            self.query(&sql).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for (name, raw_type, null, key, default, extra) in rows {
            let parsed =
                parse_column_type(&raw_type).ok_or_else(|| MigrateError::UnsupportedType {
                    table: table.to_string(),
                    column: name.clone(),
                    data_type: raw_type.clone(),
                })?;

            let mut column = Column {
                name,
                table_name: table.to_string(),
                raw_type,
                column_type: parsed.column_type,
                length: parsed.length,
                decimals: parsed.decimals,
                is_nullable: null == "YES",
                is_primary_key: key.as_deref() == Some("PRI"),
                is_auto_increment: extra.contains("auto_increment"),
                default,
                max_value: None,
            };

            if column.is_auto_increment {
                column.max_value = Some(self.max_value(table, &column.name).await?);
            }
            columns.push(column);
        }

        Ok(columns)
    }

    /// Largest value in a column, 0 for an empty table.
    async fn max_value(&mut self, table: &str, column: &str) -> Result<i64> {
        let sql = format!(
            "SELECT MAX({}) FROM {}",
            quote_mysql(column),
            quote_mysql(table)
        );
        let rows: Vec<Option<String>> = self.query(&sql).await?;
        parse_max_value(table, column, rows.into_iter().next().flatten())
    }

    async fn load_keys(&mut self, table: &mut Table) -> Result<()> {
        let sql = format!("SHOW CREATE TABLE {}", quote_mysql(&table.name));
        let rows: Vec<(String, String)> = self.query(&sql).await?;
        let (_, ddl) = rows
            .into_iter()
            .next()
            .ok_or_else(|| MigrateError::schema(&table.name, "SHOW CREATE TABLE returned nothing"))?;

        let keys = parse_create_table(&table.name, &ddl)?;
        table.indexes = keys.indexes;
        table.foreign_keys = keys.foreign_keys;
        Ok(())
    }
}

#[async_trait]
impl SourceReader for MysqlReader {
    async fn list_tables(&mut self) -> Result<Vec<String>> {
        let rows: Vec<(String, String)> = self
            .query("SHOW FULL TABLES WHERE Table_type = 'BASE TABLE'")
            .await?;
        Ok(rows.into_iter().map(|(name, _)| name).collect())
    }

    async fn load_table(&mut self, name: &str) -> Result<Table> {
        let mut table = Table::new(name);
        table.columns = self.load_columns(name).await?;
        self.load_keys(&mut table).await?;

        debug!(
            "Loaded {}: {} columns, {} indexes, {} foreign keys",
            table.name,
            table.columns.len(),
            table.indexes.len(),
            table.foreign_keys.len()
        );
        Ok(table)
    }

    async fn read<'a>(&'a mut self, table: &Table) -> Result<RowStream<'a>> {
        let sql = select_sql(table);
        debug!("{}", sql);

        ensure_live(self, is_connection_lost).await?;
        let columns = table.columns.clone();
        let stream = self
            .conn()
            .await?
            .exec_stream::<mysql_async::Row, _, _>(sql, ())
            .await?;

        Ok(stream
            .map(move |row| -> Result<Row> { Ok(convert_row(&columns, row?)) })
            .boxed())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.disconnect().await?;
        }
        Ok(())
    }
}

/// A source connection that can be replaced after it drops.
#[async_trait]
trait Session: Send {
    async fn run<T>(&mut self, sql: &str) -> std::result::Result<Vec<T>, mysql_async::Error>
    where
        T: FromRow + Send + 'static;

    async fn ping(&mut self) -> std::result::Result<(), mysql_async::Error>;

    async fn reconnect(&mut self) -> Result<()>;
}

#[async_trait]
impl Session for MysqlReader {
    async fn run<T>(&mut self, sql: &str) -> std::result::Result<Vec<T>, mysql_async::Error>
    where
        T: FromRow + Send + 'static,
    {
        match self.conn.as_mut() {
            Some(conn) => conn.query::<T, _>(sql).await,
            None => Err(DriverError::ConnectionClosed.into()),
        }
    }

    async fn ping(&mut self) -> std::result::Result<(), mysql_async::Error> {
        match self.conn.as_mut() {
            Some(conn) => conn.ping().await,
            None => Err(DriverError::ConnectionClosed.into()),
        }
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.replace_connection().await
    }
}

/// Run a metadata query. When `lost` classifies the failure as a dropped
/// connection, reconnect and run it exactly once more; that second outcome
/// is final.
async fn query_with_retry<S, T>(
    session: &mut S,
    sql: &str,
    lost: fn(&mysql_async::Error) -> bool,
) -> Result<Vec<T>>
where
    S: Session,
    T: FromRow + Send + 'static,
{
    match session.run::<T>(sql).await {
        Err(e) if lost(&e) => {
            warn!("MySQL connection lost ({}), reconnecting", e);
            session.reconnect().await?;
            Ok(session.run::<T>(sql).await?)
        }
        other => Ok(other?),
    }
}

/// Ping before streaming and reconnect once if the connection is gone.
async fn ensure_live<S: Session>(session: &mut S, lost: fn(&mysql_async::Error) -> bool) -> Result<()> {
    match session.ping().await {
        Ok(()) => Ok(()),
        Err(e) if lost(&e) => {
            warn!("MySQL connection lost ({}), reconnecting", e);
            session.reconnect().await
        }
        Err(e) => Err(e.into()),
    }
}

/// `SELECT` listing every column of the table in order.
pub fn select_sql(table: &Table) -> String {
    let columns: Vec<String> = table.column_names().map(quote_mysql).collect();
    format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        quote_mysql(&table.name)
    )
}

/// Decode a `MAX()` result. Sequences are bigint, so larger unsigned values
/// cannot be carried over.
fn parse_max_value(table: &str, column: &str, max: Option<String>) -> Result<i64> {
    let Some(max) = max else {
        return Ok(0);
    };
    max.trim().parse().map_err(|_| {
        MigrateError::schema(
            table,
            format!(
                "largest value {} of auto-increment column {} does not fit a bigint sequence",
                max, column
            ),
        )
    })
}

fn is_connection_lost(err: &mysql_async::Error) -> bool {
    match err {
        mysql_async::Error::Io(_) => true,
        mysql_async::Error::Driver(DriverError::ConnectionClosed) => true,
        mysql_async::Error::Server(e) => matches!(
            e.code,
            CR_SERVER_GONE_ERROR | CR_SERVER_LOST | ER_CLIENT_INTERACTION_TIMEOUT
        ),
        _ => false,
    }
}

fn convert_row(columns: &[Column], row: mysql_async::Row) -> Row {
    row.unwrap_raw()
        .into_iter()
        .zip(columns)
        .map(|(value, column)| match value {
            Some(value) => convert_value(column, value),
            None => SqlValue::Null,
        })
        .collect()
}

/// Map a binary-protocol value onto the column's representation.
///
/// MySQL zero dates (`0000-00-00`) have no calendar equivalent and become NULL.
fn convert_value(column: &Column, value: Value) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Bytes(bytes) => match column.column_type {
            ColumnType::Bytea | ColumnType::Bit(_) | ColumnType::Boolean => SqlValue::Bytes(bytes),
            _ => match String::from_utf8(bytes) {
                Ok(s) => SqlValue::Text(s),
                Err(e) => SqlValue::Bytes(e.into_bytes()),
            },
        },
        Value::Int(v) => SqlValue::Int(v),
        Value::UInt(v) => SqlValue::UInt(v),
        Value::Float(v) => SqlValue::Float(v),
        Value::Double(v) => SqlValue::Double(v),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let Some(date) = NaiveDate::from_ymd_opt(year.into(), month.into(), day.into()) else {
                return SqlValue::Null;
            };
            if column.column_type == ColumnType::Date {
                SqlValue::Date(date)
            } else {
                date.and_hms_micro_opt(hour.into(), minute.into(), second.into(), micros)
                    .map(SqlValue::DateTime)
                    .unwrap_or(SqlValue::Null)
            }
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let delta = TimeDelta::days(days.into())
                + TimeDelta::hours(hours.into())
                + TimeDelta::minutes(minutes.into())
                + TimeDelta::seconds(seconds.into())
                + TimeDelta::microseconds(micros.into());
            SqlValue::Time(if negative { -delta } else { delta })
        }
    }
}
