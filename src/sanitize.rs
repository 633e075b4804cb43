//! Column naming rules shared by table creation, inserts, index creation and
//! column validation. Every SQL identifier derived from header text goes
//! through [`sanitize_column_name`] so those paths never disagree.

/// Name used for empty or whitespace-only headers.
pub const UNNAMED_COLUMN: &str = "unnamed";

/// Map raw header text to a SQL-safe column identifier.
///
/// Trims surrounding whitespace, maps empty input to `unnamed`, replaces every
/// character outside `[A-Za-z0-9_]` with `_`, and prefixes `col_` when the
/// result starts with a digit.
#[must_use]
pub fn sanitize_column_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return UNNAMED_COLUMN.to_string();
    }
    let mut out: String = trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "col_");
    }
    out
}

/// Synthesized header names `col1..colN` for files without a header row.
#[must_use]
pub fn synthesized_headers(width: usize) -> Vec<String> {
    (1..=width).map(|i| format!("col{i}")).collect()
}

/// Quote an identifier for SQLite, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Deterministic index name for `table`.`column`.
///
/// The table part is length-prefixed so `a`.`b_c` and `a_b`.`c` stay distinct.
#[must_use]
pub fn index_name(table: &str, column: &str) -> String {
    let table = sanitize_column_name(table);
    format!("idx_{}_{table}_{}", table.len(), sanitize_column_name(column))
}
