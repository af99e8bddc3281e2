pub mod jsonl;
pub mod sqlite;

pub use jsonl::JsonLinesWarehouse;
pub use sqlite::SqliteWarehouse;

use crate::config::Destination;
use crate::error::Result;
use crate::types::Batch;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// What one write appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub table: String,
    pub rows_written: usize,
}

/// Appends cleaned batches to a destination table.
///
/// One call per source. An `Err` means the batch was not fully appended;
/// SQLite rolls back the whole batch, a JSON lines file may keep a truncated
/// tail if the disk write itself fails part-way.
#[async_trait]
pub trait WarehouseWriter: Send + Sync {
    /// Human-readable destination, for logs.
    fn describe(&self) -> String;

    async fn write(&self, table: &str, batch: &Batch) -> Result<WriteSummary>;
}

/// Keeps every write in memory, in call order. Used for dry runs and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryWarehouse {
    writes: Arc<Mutex<Vec<(String, Batch)>>>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of `(table, batch)` pairs written so far.
    pub fn writes(&self) -> Vec<(String, Batch)> {
        self.writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn total_rows(&self) -> usize {
        self.writes().iter().map(|(_, b)| b.len()).sum()
    }
}

#[async_trait]
impl WarehouseWriter for InMemoryWarehouse {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn write(&self, table: &str, batch: &Batch) -> Result<WriteSummary> {
        let mut writes = self
            .writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writes.push((table.to_string(), batch.clone()));
        debug!("Stored {} rows for {} in memory", batch.len(), table);
        Ok(WriteSummary {
            table: table.to_string(),
            rows_written: batch.len(),
        })
    }
}

/// Opens the writer for a configured destination.
pub fn open_writer(destination: &Destination) -> Result<Box<dyn WarehouseWriter>> {
    let writer: Box<dyn WarehouseWriter> = match destination {
        Destination::Sqlite(path) => Box::new(SqliteWarehouse::open(path)?),
        Destination::JsonLines(dir) => Box::new(JsonLinesWarehouse::new(dir)),
        Destination::Memory => Box::new(InMemoryWarehouse::new()),
    };
    Ok(writer)
}
