use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

use crate::errors::ImportError;
use crate::sanitize::{index_name, quote_ident, sanitize_column_name};

/// Column names of `table` as reported by the catalog. Empty if the table is absent.
///
/// # Errors
/// Returns the underlying SQLite error if the catalog query fails.
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    names.collect()
}

/// Create one index per requested column on `table`.
///
/// Every column is validated against the catalog first; if any is missing
/// nothing is created and the error lists all of them. Existing indexes with
/// the same deterministic name on the same table are left as they are.
/// Returns the number of columns indexed.
///
/// # Errors
/// Returns [`ImportError::ColumnNotFound`] on validation failure, or
/// [`ImportError::Schema`] if an index name is already taken by another
/// table or index creation fails.
pub fn create_indexes(
    conn: &mut Connection,
    table: &str,
    columns: &[String],
) -> Result<usize, ImportError> {
    if columns.is_empty() {
        return Ok(0);
    }
    let existing: HashSet<String> = table_columns(conn, table)
        .map_err(|e| ImportError::schema(table, format!("catalog query failed: {e}")))?
        .into_iter()
        .collect();
    let missing: Vec<String> = columns
        .iter()
        .filter(|c| !existing.contains(&sanitize_column_name(c)))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::ColumnNotFound { table: table.to_string(), columns: missing });
    }

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| ImportError::schema(table, e))?;
    let names: Vec<String> = columns.iter().map(|c| index_name(table, c)).collect();
    for name in &names {
        if let Some(owner) = index_owner(&tx, name).map_err(|e| ImportError::schema(table, e))?
            && !owner.eq_ignore_ascii_case(table)
        {
            return Err(ImportError::schema(
                table,
                format!("index name {name} already belongs to table {owner}"),
            ));
        }
    }
    for (column, name) in columns.iter().zip(&names) {
        let col = sanitize_column_name(column);
        let sql = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote_ident(name),
            quote_ident(table),
            quote_ident(&col)
        );
        tx.execute(&sql, []).map_err(|e| ImportError::schema(table, e))?;
        log::debug!("index: {table}.{col} ready");
    }
    tx.commit().map_err(|e| ImportError::schema(table, e))?;
    Ok(columns.len())
}

fn index_owner(conn: &Connection, name: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT tbl_name FROM sqlite_master WHERE type = 'index' AND name = ?1",
        [name],
        |r| r.get(0),
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE people (id TEXT, User_Name TEXT, city TEXT);").unwrap();
        conn
    }

    fn index_count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1",
            [table],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn catalog_lists_columns_in_order() {
        let conn = setup();
        assert_eq!(table_columns(&conn, "people").unwrap(), vec!["id", "User_Name", "city"]);
        assert!(table_columns(&conn, "nope").unwrap().is_empty());
    }

    #[test]
    fn raw_names_are_sanitized_before_lookup() {
        let mut conn = setup();
        let n = create_indexes(&mut conn, "people", &["User Name".into(), "id".into()]).unwrap();
        assert_eq!(n, 2);
        assert_eq!(index_count(&conn, "people"), 2);
    }

    #[test]
    fn missing_columns_create_nothing() {
        let mut conn = setup();
        let err = create_indexes(
            &mut conn,
            "people",
            &["id".into(), "email".into(), "zip".into()],
        )
        .unwrap_err();
        match err {
            ImportError::ColumnNotFound { columns, .. } => {
                assert_eq!(columns, vec!["email".to_string(), "zip".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(index_count(&conn, "people"), 0);
    }

    #[test]
    fn repeated_creation_is_idempotent() {
        let mut conn = setup();
        create_indexes(&mut conn, "people", &["city".into()]).unwrap();
        create_indexes(&mut conn, "people", &["city".into()]).unwrap();
        assert_eq!(index_count(&conn, "people"), 1);
    }

    #[test]
    fn underscore_names_index_both_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE a (b_c TEXT); CREATE TABLE a_b (c TEXT);").unwrap();
        assert_eq!(create_indexes(&mut conn, "a", &["b_c".into()]).unwrap(), 1);
        assert_eq!(create_indexes(&mut conn, "a_b", &["c".into()]).unwrap(), 1);
        assert_eq!(index_count(&conn, "a"), 1);
        assert_eq!(index_count(&conn, "a_b"), 1);
    }

    #[test]
    fn index_name_owned_by_other_table_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE \"my t\" (c TEXT); CREATE TABLE my_t (c TEXT);").unwrap();
        create_indexes(&mut conn, "my t", &["c".into()]).unwrap();
        let err = create_indexes(&mut conn, "my_t", &["c".into()]).unwrap_err();
        assert!(matches!(err, ImportError::Schema { .. }), "got {err}");
        assert_eq!(index_count(&conn, "my_t"), 0);
    }
}
