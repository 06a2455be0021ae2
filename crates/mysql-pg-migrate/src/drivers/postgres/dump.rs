//! SQL script writer.
//!
//! Produces the same statements as the live writer, as a single UTF-8 script
//! that `psql` can replay. Row data is inlined as `COPY ... FROM stdin` blocks.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::info;

use crate::core::schema::Table;
use crate::core::traits::{SourceReader, TargetWriter};
use crate::dialect::{self, SESSION_SETTINGS};
use crate::error::Result;
use crate::transfer::{copy_lines, copy_statement, ProgressMeter};

/// Writes converted schema and data to a SQL script.
pub struct FileWriter<W> {
    out: W,
    verbose: bool,
}

impl FileWriter<BufWriter<File>> {
    /// Create (or overwrite) the script at `path`.
    pub async fn create(path: &Path, verbose: bool) -> Result<Self> {
        let file = File::create(path).await?;
        info!("Writing SQL script to {}", path.display());
        Self::new(BufWriter::new(file), verbose).await
    }
}

impl<W> FileWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap an output and write the script header.
    pub async fn new(out: W, verbose: bool) -> Result<Self> {
        let mut writer = Self { out, verbose };
        writer.write_str("--\n-- MySQL to PostgreSQL dump\n--\n\n").await?;
        for setting in SESSION_SETTINGS {
            writer.write_line(setting).await?;
        }
        writer.write_str("\n").await?;
        Ok(writer)
    }

    /// Give back the underlying output.
    pub fn into_inner(self) -> W {
        self.out
    }

    async fn write_str(&mut self, s: &str) -> Result<()> {
        self.out.write_all(s.as_bytes()).await?;
        Ok(())
    }

    async fn write_line(&mut self, s: &str) -> Result<()> {
        self.write_str(s).await?;
        self.write_str("\n").await
    }

    async fn write_block<'s>(
        &mut self,
        heading: &str,
        statements: impl IntoIterator<Item = &'s String>,
    ) -> Result<()> {
        let mut statements = statements.into_iter().peekable();
        if statements.peek().is_none() {
            return Ok(());
        }
        self.write_str(&format!("--\n-- {}\n--\n\n", heading)).await?;
        for sql in statements {
            self.write_line(sql).await?;
        }
        self.write_str("\n").await
    }
}

#[async_trait]
impl<W> TargetWriter for FileWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_table(&mut self, table: &Table) -> Result<()> {
        let ddl = dialect::write_table(table);
        self.write_block(&format!("Sequences for Name: {}", table.name), &ddl.sequences)
            .await?;
        self.write_block(&format!("Name: {}; Type: TABLE;", table.name), &ddl.table)
            .await
    }

    async fn write_indexes(&mut self, table: &Table) -> Result<()> {
        let statements = dialect::write_indexes(table);
        self.write_block(&format!("Indexes for Name: {}", table.name), &statements)
            .await
    }

    async fn write_constraints(&mut self, table: &Table) -> Result<()> {
        let statements = dialect::write_constraints(table);
        self.write_block(
            &format!("Foreign keys for Name: {}", table.name),
            &statements,
        )
        .await
    }

    async fn truncate(&mut self, table: &Table) -> Result<()> {
        let statements = dialect::truncate(table);
        self.write_block(&format!("Truncate Name: {}", table.name), &statements)
            .await
    }

    async fn write_contents(
        &mut self,
        table: &Table,
        reader: &mut dyn SourceReader,
    ) -> Result<u64> {
        self.write_str(&format!(
            "--\n-- Data for Name: {}; Type: TABLE DATA;\n--\n\n{};\n",
            table.name,
            copy_statement(table)
        ))
        .await?;

        let rows = reader.read(table).await?;
        let mut lines = copy_lines(table, rows);
        let mut progress = ProgressMeter::new(&table.name, self.verbose);
        while let Some(line) = lines.next().await {
            self.write_str(&line?).await?;
            progress.tick();
        }

        self.write_str("\\.\n\n").await?;
        Ok(progress.finish())
    }

    async fn close(&mut self) -> Result<()> {
        self.out.flush().await?;
        self.out.shutdown().await?;
        Ok(())
    }
}
