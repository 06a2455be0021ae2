//! PostgreSQL DDL generation for converted tables.
//!
//! Every function here is pure and returns complete, semicolon-terminated
//! statements. Writers decide whether to execute them or print them.

use crate::core::identifier::{quote_literal, quote_pg};
use crate::core::schema::{Column, ForeignKey, Index, Table};
use crate::typemap::column_description;

/// Session settings applied before any DDL or data.
pub const SESSION_SETTINGS: [&str; 4] = [
    "SET client_encoding = 'UTF8';",
    "SET standard_conforming_strings = off;",
    "SET check_function_bodies = false;",
    "SET client_min_messages = warning;",
];

/// Point unqualified names at `schema`.
pub fn set_search_path(schema: &str) -> String {
    format!("SET search_path TO {};", quote_pg(schema))
}

/// Statements creating one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDdl {
    /// Sequence drop/create/seed statements, one group per auto-increment column.
    pub sequences: Vec<String>,
    /// DROP TABLE and CREATE TABLE.
    pub table: Vec<String>,
}

impl TableDdl {
    /// All statements in execution order.
    pub fn statements(&self) -> impl Iterator<Item = &String> {
        self.sequences.iter().chain(self.table.iter())
    }
}

/// Sequences and table definition for `table`.
pub fn write_table(table: &Table) -> TableDdl {
    let mut sequences = Vec::new();
    for column in table.auto_increment_columns() {
        let seq = quote_pg(&column.sequence_name());
        sequences.push(format!("DROP SEQUENCE IF EXISTS {} CASCADE;", seq));
        sequences.push(format!(
            "CREATE SEQUENCE {} INCREMENT BY 1 NO MAXVALUE NO MINVALUE CACHE 1;",
            seq
        ));
        sequences.push(setval(column));
    }

    let name = quote_pg(&table.name);
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("  {}", column_description(c)))
        .collect();

    TableDdl {
        sequences,
        table: vec![
            format!("DROP TABLE IF EXISTS {} CASCADE;", name),
            format!("CREATE TABLE {} (\n{}\n);", name, columns.join(",\n")),
        ],
    }
}

/// Primary key constraint followed by secondary indexes.
pub fn write_indexes(table: &Table) -> Vec<String> {
    let name = quote_pg(&table.name);
    let mut statements = Vec::new();

    if let Some(pk) = table.primary_key() {
        statements.push(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({});",
            name,
            quote_pg(&primary_key_name(&table.name, pk)),
            column_list(&pk.columns)
        ));
    }

    for index in table.secondary_indexes() {
        let index_name = quote_pg(&format!("{}_{}", table.name, index.columns.join("_")));
        statements.push(format!("DROP INDEX IF EXISTS {} CASCADE;", index_name));
        statements.push(format!(
            "CREATE {}INDEX {} ON {} ({});",
            if index.is_unique { "UNIQUE " } else { "" },
            index_name,
            name,
            column_list(&index.columns)
        ));
    }

    statements
}

/// Foreign key constraints.
pub fn write_constraints(table: &Table) -> Vec<String> {
    table
        .foreign_keys
        .iter()
        .map(|fk| foreign_key(&table.name, fk))
        .collect()
}

/// Truncate the table and reset every sequence to follow the source maximum.
pub fn truncate(table: &Table) -> Vec<String> {
    let mut statements = vec![format!("TRUNCATE {} CASCADE;", quote_pg(&table.name))];
    statements.extend(table.auto_increment_columns().map(setval));
    statements
}

/// Seed a column's sequence so the next value is one past the largest existing value.
fn setval(column: &Column) -> String {
    let next = column.max_value.unwrap_or(0).saturating_add(1);
    format!(
        "SELECT pg_catalog.setval({}, {}, false);",
        quote_literal(&quote_pg(&column.sequence_name())),
        next
    )
}

fn primary_key_name(table: &str, pk: &Index) -> String {
    let columns: String = pk
        .columns
        .join("_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    format!("{}_{}_pkey", table, columns)
}

fn foreign_key(table: &str, fk: &ForeignKey) -> String {
    format!(
        "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {} ({});",
        quote_pg(table),
        column_list(&fk.columns),
        quote_pg(&fk.ref_table),
        column_list(&fk.ref_columns)
    )
}

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_pg(c))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ColumnType;

    fn users(max_id: i64) -> Table {
        let mut table = Table::new("users");
        table.columns = vec![
            Column {
                name: "id".to_string(),
                table_name: "users".to_string(),
                raw_type: "int(11)".to_string(),
                column_type: ColumnType::Integer,
                length: Some(11),
                decimals: None,
                is_nullable: false,
                is_primary_key: true,
                is_auto_increment: true,
                default: None,
                max_value: Some(max_id),
            },
            Column {
                name: "email".to_string(),
                table_name: "users".to_string(),
                raw_type: "varchar(120)".to_string(),
                column_type: ColumnType::Varchar,
                length: Some(120),
                decimals: None,
                is_nullable: true,
                is_primary_key: false,
                is_auto_increment: false,
                default: None,
                max_value: None,
            },
        ];
        table.indexes = vec![
            Index {
                name: "PRIMARY".to_string(),
                columns: vec!["id".to_string()],
                is_unique: true,
                is_primary: true,
            },
            Index {
                name: "uq_email".to_string(),
                columns: vec!["email".to_string()],
                is_unique: true,
                is_primary: false,
            },
        ];
        table.foreign_keys = vec![ForeignKey {
            name: "fk_team".to_string(),
            columns: vec!["team_id".to_string()],
            ref_table: "teams".to_string(),
            ref_columns: vec!["id".to_string()],
        }];
        table
    }

    #[test]
    fn test_write_table() {
        let ddl = write_table(&users(41));
        assert_eq!(
            ddl.sequences,
            vec![
                "DROP SEQUENCE IF EXISTS \"users_id_seq\" CASCADE;",
                "CREATE SEQUENCE \"users_id_seq\" INCREMENT BY 1 NO MAXVALUE NO MINVALUE CACHE 1;",
                "SELECT pg_catalog.setval('\"users_id_seq\"', 42, false);",
            ]
        );
        assert_eq!(ddl.table[0], "DROP TABLE IF EXISTS \"users\" CASCADE;");
        assert_eq!(
            ddl.table[1],
            "CREATE TABLE \"users\" (\n  \"id\" integer DEFAULT nextval('\"users_id_seq\"'::regclass) NOT NULL,\n  \"email\" character varying(120)\n);"
        );
        assert_eq!(ddl.statements().count(), 5);
    }

    #[test]
    fn test_empty_table_seeds_sequence_at_one() {
        let ddl = write_table(&users(0));
        assert!(ddl.sequences[2].contains(", 1, false)"));
    }

    #[test]
    fn test_table_without_auto_increment_has_no_sequences() {
        let mut table = users(0);
        table.columns[0].is_auto_increment = false;
        assert!(write_table(&table).sequences.is_empty());
        assert_eq!(truncate(&table), vec!["TRUNCATE \"users\" CASCADE;"]);
    }

    #[test]
    fn test_write_indexes_primary_first() {
        let statements = write_indexes(&users(0));
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE \"users\" ADD CONSTRAINT \"users_id_pkey\" PRIMARY KEY (\"id\");",
                "DROP INDEX IF EXISTS \"users_email\" CASCADE;",
                "CREATE UNIQUE INDEX \"users_email\" ON \"users\" (\"email\");",
            ]
        );
    }

    #[test]
    fn test_composite_primary_key_name() {
        let pk = Index {
            name: "PRIMARY".to_string(),
            columns: vec!["order_id".to_string(), "line-no".to_string()],
            is_unique: true,
            is_primary: true,
        };
        assert_eq!(primary_key_name("lines", &pk), "lines_order_id_lineno_pkey");
    }

    #[test]
    fn test_write_constraints() {
        assert_eq!(
            write_constraints(&users(0)),
            vec!["ALTER TABLE \"users\" ADD FOREIGN KEY (\"team_id\") REFERENCES \"teams\" (\"id\");"]
        );
    }

    #[test]
    fn test_truncate_resets_sequence() {
        assert_eq!(
            truncate(&users(9)),
            vec![
                "TRUNCATE \"users\" CASCADE;",
                "SELECT pg_catalog.setval('\"users_id_seq\"', 10, false);",
            ]
        );
    }
}
