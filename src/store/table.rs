use rusqlite::{Connection, TransactionBehavior, params_from_iter};

use crate::errors::ImportError;
use crate::import::ParsedHeader;
use crate::sanitize::quote_ident;

/// Rows per insert transaction.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Drop `table` if present and recreate it with one TEXT column per header.
///
/// # Errors
/// Returns [`ImportError::Schema`] if either statement fails.
pub fn create_table(conn: &Connection, table: &str, header: &ParsedHeader) -> Result<(), ImportError> {
    let name = quote_ident(table);
    conn.execute(&format!("DROP TABLE IF EXISTS {name}"), [])
        .map_err(|e| ImportError::schema(table, format!("drop failed: {e}")))?;
    let columns: Vec<String> =
        header.columns().iter().map(|c| format!("{} TEXT", quote_ident(c))).collect();
    let sql = format!("CREATE TABLE {name} ({})", columns.join(", "));
    conn.execute(&sql, []).map_err(|e| ImportError::schema(table, e))?;
    log::debug!("table: created {table} with {} columns", columns.len());
    Ok(())
}

/// Insert `rows` into `table` inside one transaction.
///
/// Each row is fitted to the header width: missing trailing fields become
/// empty strings and extra fields are dropped. Any failure rolls the whole
/// batch back. An empty batch is a no-op.
///
/// # Errors
/// Returns [`ImportError::Write`] if the transaction cannot be opened, a row
/// fails to insert, or the commit fails.
pub fn insert_batch(
    conn: &mut Connection,
    table: &str,
    header: &ParsedHeader,
    rows: &[Vec<String>],
) -> Result<(), ImportError> {
    if rows.is_empty() {
        return Ok(());
    }
    let width = header.len();
    let columns: Vec<String> = header.columns().iter().map(|c| quote_ident(c)).collect();
    let placeholders = vec!["?"; width].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        quote_ident(table),
        columns.join(", ")
    );

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| ImportError::write(table, format!("begin failed: {e}")))?;
    {
        let mut stmt = tx
            .prepare(&sql)
            .map_err(|e| ImportError::write(table, format!("prepare failed: {e}")))?;
        for row in rows {
            let values = (0..width).map(|i| row.get(i).map_or("", String::as_str));
            stmt.execute(params_from_iter(values)).map_err(|e| ImportError::write(table, e))?;
        }
    }
    tx.commit().map_err(|e| ImportError::write(table, format!("commit failed: {e}")))?;
    Ok(())
}
