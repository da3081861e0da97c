//! Small SQL text helpers shared by the SQLite and DuckDB backends

/// Quote an identifier with double quotes, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
