//! Conversion orchestrator - main workflow coordinator.
//!
//! A run is strictly sequential: every table's DDL, then truncation (when
//! reloading into an existing schema), then data, then indexes for every
//! table, then foreign keys for every table. Any error stops the run.

use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Config, Destination};
use crate::core::schema::Table;
use crate::core::traits::{SourceReader, TargetWriter};
use crate::drivers::{FileWriter, MysqlReader, PostgresWriter};
use crate::error::{MigrateError, Result};

/// Behaviour switches for a run.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Only these tables, in this order.
    pub only_tables: Vec<String>,
    /// Skip these tables (ignored when `only_tables` is set).
    pub exclude_tables: Vec<String>,
    pub suppress_ddl: bool,
    pub suppress_data: bool,
    pub force_truncate: bool,
    /// Log per-table status lines and row throughput at info level.
    pub verbose: bool,
}

impl ConvertOptions {
    /// Options taken from a loaded configuration.
    pub fn from_config(config: &Config, verbose: bool) -> Self {
        Self {
            only_tables: config.only_tables.clone(),
            exclude_tables: config.exclude_tables.clone(),
            suppress_ddl: config.suppress_ddl,
            suppress_data: config.suppress_data,
            force_truncate: config.force_truncate,
            verbose,
        }
    }
}

/// Result of a conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Final status.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Tables processed, in processing order.
    pub tables: Vec<String>,

    /// Number of tables processed.
    pub tables_total: usize,

    /// Total rows copied.
    pub rows_transferred: u64,

    /// Average throughput (rows/second).
    pub rows_per_second: u64,
}

impl ConversionResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Pick the tables to convert from what the source reports.
///
/// A non-empty include-list wins and fixes the order; names the source does
/// not have are skipped with a warning, and repeated names are kept once.
/// Otherwise the exclude-list is removed from the source order.
pub fn select_tables(available: Vec<String>, only: &[String], exclude: &[String]) -> Vec<String> {
    if !only.is_empty() {
        let mut seen = HashSet::new();
        return only
            .iter()
            .filter(|&name| {
                if !available.contains(name) {
                    warn!("Table {} is not in the source database, skipping", name);
                    return false;
                }
                seen.insert(name.as_str())
            })
            .cloned()
            .collect();
    }
    available
        .into_iter()
        .filter(|name| !exclude.contains(name))
        .collect()
}

/// Drives one conversion between a reader and a writer.
pub struct Converter<'a> {
    reader: &'a mut dyn SourceReader,
    writer: &'a mut dyn TargetWriter,
    options: ConvertOptions,
}

impl<'a> Converter<'a> {
    pub fn new(
        reader: &'a mut dyn SourceReader,
        writer: &'a mut dyn TargetWriter,
        options: ConvertOptions,
    ) -> Self {
        Self {
            reader,
            writer,
            options,
        }
    }

    /// Run every phase and close the writer.
    pub async fn convert(self) -> Result<ConversionResult> {
        let Converter {
            reader,
            writer,
            options,
        } = self;
        let started_at = Utc::now();
        let start = Instant::now();

        let names = select_tables(
            reader.list_tables().await?,
            &options.only_tables,
            &options.exclude_tables,
        );
        let mut tables: Vec<Table> = Vec::with_capacity(names.len());
        for name in &names {
            tables.push(reader.load_table(name).await?);
        }
        info!("Converting {} tables", tables.len());

        if !options.suppress_ddl {
            info!("Creating tables");
            for table in &tables {
                status(&options, "START CREATING TABLE", table);
                writer.write_table(table).await?;
                status(&options, "FINISH CREATING TABLE", table);
            }
        }

        if options.force_truncate && options.suppress_ddl {
            info!("Truncating tables");
            for table in &tables {
                status(&options, "TRUNCATING TABLE", table);
                writer.truncate(table).await?;
            }
        }

        let mut rows_transferred = 0u64;
        if !options.suppress_data {
            info!("Loading data");
            for table in &tables {
                status(&options, "START WRITING DATA TO", table);
                rows_transferred += writer.write_contents(table, &mut *reader).await?;
                status(&options, "FINISH WRITING DATA TO", table);
            }
        }

        if !options.suppress_ddl {
            info!("Creating indexes and constraints");
            for table in &tables {
                status(&options, "START ADDING INDEXES TO", table);
                writer.write_indexes(table).await?;
                status(&options, "FINISH ADDING INDEXES TO", table);
            }
            for table in &tables {
                status(&options, "START ADDING CONSTRAINTS ON", table);
                writer.write_constraints(table).await?;
                status(&options, "FINISH ADDING CONSTRAINTS ON", table);
            }
        }

        writer.close().await?;

        let duration = start.elapsed().as_secs_f64();
        let rows_per_second = if duration > 0.0 {
            (rows_transferred as f64 / duration) as u64
        } else {
            rows_transferred
        };
        let result = ConversionResult {
            status: "completed".to_string(),
            duration_seconds: duration,
            started_at,
            completed_at: Utc::now(),
            tables_total: names.len(),
            tables: names,
            rows_transferred,
            rows_per_second,
        };

        info!(
            "Conversion {}: {} tables, {} rows in {:.1}s ({} rows/s)",
            result.status,
            result.tables_total,
            result.rows_transferred,
            result.duration_seconds,
            result.rows_per_second
        );
        Ok(result)
    }
}

fn status(options: &ConvertOptions, action: &str, table: &Table) {
    if options.verbose {
        info!("{} {}", action, table.name);
    } else {
        debug!("{} {}", action, table.name);
    }
}

/// Conversion orchestrator: connects the source and destination named in the
/// configuration and runs a [`Converter`] between them.
pub struct Orchestrator {
    config: Config,
    verbose: bool,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            verbose: false,
        }
    }

    /// Enable per-table status lines and throughput reports.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run the conversion.
    pub async fn run(self) -> Result<ConversionResult> {
        let options = ConvertOptions::from_config(&self.config, self.verbose);
        let destination = self.config.destination.resolve().ok_or_else(|| {
            MigrateError::Config("destination.file or destination.postgres is required".into())
        })?;

        let mut reader = MysqlReader::connect(&self.config.mysql).await?;
        let result = match destination {
            Destination::File(path) => {
                let mut writer = FileWriter::create(path, self.verbose).await?;
                Converter::new(&mut reader, &mut writer, options).convert().await
            }
            Destination::Postgres(pg) => {
                let mut writer = PostgresWriter::connect(pg, self.verbose).await?;
                Converter::new(&mut reader, &mut writer, options).convert().await
            }
        };
        let closed = reader.close().await;
        settle(result, closed)
    }
}

/// Outcome of a run given the result of closing the source afterwards.
///
/// A close failure is reported only when the conversion itself succeeded.
fn settle<T>(result: Result<T>, closed: Result<()>) -> Result<T> {
    match (result, closed) {
        (result, Ok(())) => result,
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Err(close)) => {
            warn!("Failed to close MySQL source after conversion error: {}", close);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, ColumnType, Index};
    use crate::core::traits::RowStream;
    use crate::core::value::{Row, SqlValue};
    use async_trait::async_trait;
    use futures::stream::{self, StreamExt};

    /// Source backed by in-memory tables.
    struct MemoryReader {
        tables: Vec<(Table, Vec<Row>)>,
    }

    #[async_trait]
    impl SourceReader for MemoryReader {
        async fn list_tables(&mut self) -> Result<Vec<String>> {
            Ok(self.tables.iter().map(|(t, _)| t.name.clone()).collect())
        }

        async fn load_table(&mut self, name: &str) -> Result<Table> {
            self.tables
                .iter()
                .find(|(t, _)| t.name == name)
                .map(|(t, _)| t.clone())
                .ok_or_else(|| MigrateError::schema(name, "no such table"))
        }

        async fn read<'a>(&'a mut self, table: &Table) -> Result<RowStream<'a>> {
            let rows = self
                .tables
                .iter()
                .find(|(t, _)| t.name == table.name)
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default();
            Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn column(table: &str, name: &str, column_type: ColumnType) -> Column {
        Column {
            name: name.to_string(),
            table_name: table.to_string(),
            raw_type: String::new(),
            column_type,
            length: None,
            decimals: None,
            is_nullable: true,
            is_primary_key: false,
            is_auto_increment: false,
            default: None,
            max_value: None,
        }
    }

    /// `id INT AUTO_INCREMENT PRIMARY KEY, name VARCHAR(50), active TINYINT(1) DEFAULT 1`
    fn users_table(max_id: i64) -> Table {
        let mut id = column("users", "id", ColumnType::Integer);
        id.is_nullable = false;
        id.is_primary_key = true;
        id.is_auto_increment = true;
        id.max_value = Some(max_id);

        let mut name = column("users", "name", ColumnType::Varchar);
        name.length = Some(50);

        let mut active = column("users", "active", ColumnType::Boolean);
        active.default = Some("1".to_string());

        let mut table = Table::new("users");
        table.columns = vec![id, name, active];
        table.indexes.push(Index {
            name: "PRIMARY".to_string(),
            columns: vec!["id".to_string()],
            is_unique: true,
            is_primary: true,
        });
        table
    }

    fn user_rows() -> Vec<Row> {
        vec![
            vec![SqlValue::Int(1), SqlValue::Text("Alice".into()), SqlValue::Int(1)],
            vec![SqlValue::Int(2), SqlValue::Text("Bob".into()), SqlValue::Int(0)],
        ]
    }

    async fn convert(
        reader: &mut MemoryReader,
        options: ConvertOptions,
    ) -> (ConversionResult, String) {
        let mut writer = FileWriter::new(Vec::new(), false).await.unwrap();
        let result = Converter::new(reader, &mut writer, options)
            .convert()
            .await
            .unwrap();
        (result, String::from_utf8(writer.into_inner()).unwrap())
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_tables_include_order() {
        let selected = select_tables(
            names(&["a", "b", "c"]),
            &names(&["c", "missing", "a"]),
            &names(&["c"]),
        );
        assert_eq!(selected, names(&["c", "a"]));
    }

    #[test]
    fn test_conversion_error_survives_close_failure() {
        let result: Result<()> = settle(
            Err(MigrateError::transfer("users", "COPY failed")),
            Err(MigrateError::connection("gone", "closing MySQL source")),
        );
        assert!(matches!(result, Err(MigrateError::Transfer { .. })));
    }

    #[test]
    fn test_close_failure_reported_after_success() {
        let result = settle(Ok(7u64), Err(MigrateError::connection("gone", "closing")));
        assert!(matches!(result, Err(MigrateError::Connection { .. })));
        assert_eq!(settle(Ok(7u64), Ok(())).unwrap(), 7);
    }

    #[test]
    fn test_select_tables_repeated_include_name_kept_once() {
        let selected = select_tables(
            names(&["users", "orders"]),
            &names(&["users", "orders", "users"]),
            &[],
        );
        assert_eq!(selected, names(&["users", "orders"]));
    }

    #[test]
    fn test_select_tables_exclude_keeps_source_order() {
        let selected = select_tables(names(&["a", "b", "c", "d"]), &[], &names(&["b", "d"]));
        assert_eq!(selected, names(&["a", "c"]));
    }

    #[test]
    fn test_select_tables_no_filters() {
        assert_eq!(select_tables(names(&["x", "y"]), &[], &[]), names(&["x", "y"]));
    }

    #[tokio::test]
    async fn test_users_end_to_end() {
        let mut reader = MemoryReader {
            tables: vec![(users_table(2), user_rows())],
        };
        let (result, out) = convert(&mut reader, ConvertOptions::default()).await;

        assert_eq!(result.rows_transferred, 2);
        assert_eq!(result.tables, names(&["users"]));
        assert!(out.contains("CREATE SEQUENCE \"users_id_seq\""));
        assert!(out.contains("SELECT pg_catalog.setval('\"users_id_seq\"', 3, false);"));
        assert!(out.contains(
            "  \"id\" integer DEFAULT nextval('\"users_id_seq\"'::regclass) NOT NULL,\n"
        ));
        assert!(out.contains("  \"name\" character varying(50),\n"));
        assert!(out.contains("  \"active\" boolean DEFAULT true\n"));
        assert!(out.contains(
            "COPY \"users\" (\"id\", \"name\", \"active\") FROM stdin;\n1\tAlice\tt\n2\tBob\tf\n\\.\n"
        ));

        let create = out.find("CREATE TABLE").unwrap();
        let copy = out.find("COPY \"users\"").unwrap();
        let pkey = out.find("ADD CONSTRAINT \"users_id_pkey\"").unwrap();
        assert!(create < copy && copy < pkey);
    }

    #[tokio::test]
    async fn test_empty_table_seeds_sequence_at_one() {
        let mut reader = MemoryReader {
            tables: vec![(users_table(0), Vec::new())],
        };
        let (result, out) = convert(&mut reader, ConvertOptions::default()).await;

        assert_eq!(result.rows_transferred, 0);
        assert!(out.contains("SELECT pg_catalog.setval('\"users_id_seq\"', 1, false);"));
        assert!(out.contains("COPY \"users\" (\"id\", \"name\", \"active\") FROM stdin;\n\\.\n"));
    }

    #[tokio::test]
    async fn test_force_truncate_without_ddl() {
        let mut reader = MemoryReader {
            tables: vec![(users_table(2), user_rows())],
        };
        let options = ConvertOptions {
            suppress_ddl: true,
            force_truncate: true,
            ..Default::default()
        };
        let (_, out) = convert(&mut reader, options).await;

        let truncate = out.find("TRUNCATE \"users\" CASCADE;").unwrap();
        let reset = out
            .find("SELECT pg_catalog.setval('\"users_id_seq\"', 3, false);")
            .unwrap();
        let copy = out.find("COPY \"users\"").unwrap();
        assert!(truncate < reset && reset < copy);
        assert!(!out.contains("CREATE TABLE"));
        assert!(!out.contains("CREATE SEQUENCE"));
        assert!(!out.contains("ADD CONSTRAINT"));
    }

    #[tokio::test]
    async fn test_force_truncate_ignored_with_ddl() {
        let mut reader = MemoryReader {
            tables: vec![(users_table(2), user_rows())],
        };
        let options = ConvertOptions {
            force_truncate: true,
            ..Default::default()
        };
        let (_, out) = convert(&mut reader, options).await;
        assert!(!out.contains("TRUNCATE"));
        assert!(out.contains("CREATE TABLE"));
    }

    #[tokio::test]
    async fn test_suppress_data() {
        let mut reader = MemoryReader {
            tables: vec![(users_table(2), user_rows())],
        };
        let options = ConvertOptions {
            suppress_data: true,
            ..Default::default()
        };
        let (result, out) = convert(&mut reader, options).await;
        assert_eq!(result.rows_transferred, 0);
        assert!(!out.contains("COPY"));
        assert!(out.contains("ADD CONSTRAINT"));
    }

    #[tokio::test]
    async fn test_constraints_follow_all_indexes() {
        let mut orders = Table::new("orders");
        orders.columns = vec![
            column("orders", "id", ColumnType::Integer),
            column("orders", "user_id", ColumnType::Integer),
        ];
        orders.foreign_keys.push(crate::core::schema::ForeignKey {
            name: "fk_user".to_string(),
            columns: vec!["user_id".to_string()],
            ref_table: "users".to_string(),
            ref_columns: vec!["id".to_string()],
        });

        let mut reader = MemoryReader {
            tables: vec![(orders, Vec::new()), (users_table(0), Vec::new())],
        };
        let (_, out) = convert(&mut reader, ConvertOptions::default()).await;

        let fk = out.find("ADD FOREIGN KEY").unwrap();
        let users_pk = out.find("ADD CONSTRAINT \"users_id_pkey\"").unwrap();
        assert!(users_pk < fk);
    }

    #[tokio::test]
    async fn test_include_list_order_drives_output() {
        let mut a = users_table(0);
        a.name = "alpha".to_string();
        let mut b = users_table(0);
        b.name = "beta".to_string();
        let mut reader = MemoryReader {
            tables: vec![(a, Vec::new()), (b, Vec::new())],
        };
        let options = ConvertOptions {
            only_tables: names(&["beta", "alpha"]),
            ..Default::default()
        };
        let (result, out) = convert(&mut reader, options).await;
        assert_eq!(result.tables, names(&["beta", "alpha"]));
        assert!(out.find("CREATE TABLE \"beta\"").unwrap() < out.find("CREATE TABLE \"alpha\"").unwrap());
    }
}
