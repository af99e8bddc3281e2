use super::{WarehouseWriter, WriteSummary};
use crate::constants::{DURATION, OUTPUT_COLUMNS};
use crate::error::{EtlError, Result};
use crate::types::{Batch, Value};
use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// SQLite-backed warehouse table.
///
/// The table is created with the normalized output columns plus any extra
/// columns of the first batch written. Batches insert by column name and must
/// not bring columns the table lacks; a raw `DURATION` column left by a
/// partially cleaned batch is not stored.
pub struct SqliteWarehouse {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteWarehouse {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Column names of `table`, empty if it does not exist.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap_or_else(|p| p.into_inner());
        table_columns(&conn, table)
    }

    pub fn count_rows(&self, table: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(|p| p.into_inner());
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Timestamp(ts) => SqlValue::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn append(conn: &mut Connection, table: &str, batch: &Batch) -> Result<usize> {
    let stored: Vec<usize> = (0..batch.width())
        .filter(|&i| batch.columns()[i] != DURATION)
        .collect();
    if stored.len() < batch.width() {
        warn!(
            "Dropping unconverted {} column from batch for {}",
            DURATION, table
        );
    }
    let names: Vec<&String> = stored.iter().map(|&i| &batch.columns()[i]).collect();

    let tx = conn.transaction()?;

    let mut existing = table_columns(&tx, table)?;
    if existing.is_empty() {
        let mut columns: Vec<String> = OUTPUT_COLUMNS.iter().map(|c| c.to_string()).collect();
        for name in &names {
            if !columns.contains(name) {
                columns.push((*name).clone());
            }
        }
        let defs: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        tx.execute_batch(&format!(
            "CREATE TABLE {} ({});",
            quote_ident(table),
            defs.join(", ")
        ))?;
        info!("Created warehouse table {}", table);
        existing = columns;
    }

    let unknown: Vec<&String> = names
        .iter()
        .copied()
        .filter(|c| !existing.contains(c))
        .collect();
    if !unknown.is_empty() {
        return Err(EtlError::Schema(format!(
            "table {} has no column(s) {:?}",
            table, unknown
        )));
    }

    let columns: Vec<String> = names.iter().map(|c| quote_ident(c)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(", "),
        placeholders.join(", ")
    );

    {
        let mut stmt = tx.prepare(&sql)?;
        for row in batch.rows() {
            stmt.execute(params_from_iter(stored.iter().map(|&i| to_sql(&row[i]))))?;
        }
    }
    tx.commit()?;
    Ok(batch.len())
}

#[async_trait]
impl WarehouseWriter for SqliteWarehouse {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }

    async fn write(&self, table: &str, batch: &Batch) -> Result<WriteSummary> {
        let rows_written = {
            let mut conn = self.conn.lock().unwrap_or_else(|p| p.into_inner());
            append(&mut conn, table, batch)?
        };
        debug!("Appended {} rows to {}", rows_written, table);
        Ok(WriteSummary {
            table: table.to_string(),
            rows_written,
        })
    }
}
