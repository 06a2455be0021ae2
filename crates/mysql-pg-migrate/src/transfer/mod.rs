//! Data transfer: turning a source row stream into COPY text lines.
//!
//! [`copy_lines`] is the pull adapter between the reader and a writer. Each
//! pull fetches the next source row, normalizes it and yields one encoded
//! line; the stream ends when the table is exhausted. Nothing is read ahead.

mod normalize;
mod progress;

pub use normalize::{encode_row, encode_value, escape_copy_text, EPOCH_TIMESTAMP, NULL_MARKER};
pub use progress::{ProgressMeter, REPORT_INTERVAL};

use futures::{Stream, StreamExt};

use crate::core::identifier::quote_pg;
use crate::core::schema::Table;
use crate::core::traits::RowStream;
use crate::error::Result;

/// Typical encoded width of a column, used to size line buffers.
const BYTES_PER_COLUMN: usize = 16;

/// Lazy stream of COPY text lines, one per source row, newline-terminated.
pub fn copy_lines<'a>(
    table: &'a Table,
    rows: RowStream<'a>,
) -> impl Stream<Item = Result<String>> + Send + Unpin + 'a {
    let capacity = table.columns.len() * BYTES_PER_COLUMN;
    rows.map(move |row| -> Result<String> {
        let row = row?;
        let mut line = String::with_capacity(capacity);
        encode_row(&table.columns, &row, &mut line)?;
        Ok(line)
    })
}

/// `COPY "t" ("a", "b") FROM stdin` for a table, without terminator.
pub fn copy_statement(table: &Table) -> String {
    let columns: Vec<String> = table.column_names().map(quote_pg).collect();
    format!(
        "COPY {} ({}) FROM stdin",
        quote_pg(&table.name),
        columns.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, ColumnType};
    use crate::core::value::SqlValue;
    use futures::stream;

    fn table() -> Table {
        let mut table = Table::new("notes");
        for (name, ty) in [("id", ColumnType::Integer), ("body", ColumnType::Text)] {
            table.columns.push(Column {
                name: name.to_string(),
                table_name: "notes".to_string(),
                raw_type: String::new(),
                column_type: ty,
                length: None,
                decimals: None,
                is_nullable: true,
                is_primary_key: false,
                is_auto_increment: false,
                default: None,
                max_value: None,
            });
        }
        table
    }

    #[test]
    fn test_copy_statement() {
        assert_eq!(
            copy_statement(&table()),
            "COPY \"notes\" (\"id\", \"body\") FROM stdin"
        );
    }

    #[tokio::test]
    async fn test_copy_lines_encodes_each_row() {
        let table = table();
        let rows: RowStream<'_> = stream::iter(vec![
            Ok(vec![SqlValue::Int(1), SqlValue::Text("hi\nthere".into())]),
            Ok(vec![SqlValue::Int(2), SqlValue::Null]),
        ])
        .boxed();

        let lines: Vec<String> = copy_lines(&table, rows)
            .map(|l| l.unwrap())
            .collect()
            .await;
        assert_eq!(lines, vec!["1\thi\\nthere\n", "2\t\\N\n"]);
    }

    #[tokio::test]
    async fn test_copy_lines_propagates_source_errors() {
        let table = table();
        let rows: RowStream<'_> = stream::iter(vec![Err(crate::error::MigrateError::transfer(
            "notes", "boom",
        ))])
        .boxed();

        let mut lines = copy_lines(&table, rows);
        assert!(lines.next().await.unwrap().is_err());
        assert!(lines.next().await.is_none());
    }
}
