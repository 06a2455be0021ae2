//! Identifier and literal quoting for generated SQL.
//!
//! Identifiers cannot be bound as statement parameters, so every table,
//! column, index and sequence name that reaches generated SQL goes through
//! one of these functions. Names are always quoted; PostgreSQL then keeps
//! the source spelling (including case) exactly.

/// Quote a PostgreSQL identifier with double quotes, doubling embedded quotes.
pub fn quote_pg(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a MySQL identifier with backticks, doubling embedded backticks.
pub fn quote_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a PostgreSQL string literal.
///
/// Single quotes are doubled. Literals containing a backslash use the `E''`
/// form with backslashes doubled, so the result reads the same whether or not
/// `standard_conforming_strings` is on.
pub fn quote_literal(value: &str) -> String {
    let escaped = value.replace('\'', "''");
    if escaped.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{}'", escaped)
    }
}
