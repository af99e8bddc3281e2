use super::{WarehouseWriter, WriteSummary};
use crate::error::Result;
use crate::types::Batch;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Appends records as JSON lines to `<dir>/<table>.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonLinesWarehouse {
    dir: PathBuf,
}

impl JsonLinesWarehouse {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.jsonl"))
    }
}

#[async_trait]
impl WarehouseWriter for JsonLinesWarehouse {
    fn describe(&self) -> String {
        format!("jsonl:{}", self.dir.display())
    }

    async fn write(&self, table: &str, batch: &Batch) -> Result<WriteSummary> {
        tokio::fs::create_dir_all(&self.dir).await?;

        // Serialize everything first so a bad record leaves the file untouched
        let mut buf = Vec::new();
        for record in batch.to_json_records() {
            serde_json::to_writer(&mut buf, &record)?;
            buf.push(b'\n');
        }

        let path = self.table_path(table);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&buf).await?;
        file.flush().await?;

        debug!("Appended {} records to {}", batch.len(), path.display());
        Ok(WriteSummary {
            table: table.to_string(),
            rows_written: batch.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_appends_one_line_per_record() {
        let dir = tempdir().unwrap();
        let warehouse = JsonLinesWarehouse::new(dir.path());
        let batch = Batch::from_records(
            &["TITLE", "DURATION_MINUTES"],
            vec![
                vec![Value::text("The Office"), Value::Int(840)],
                vec![Value::text("Dark"), Value::Null],
            ],
        );

        warehouse.write("TITLES", &batch).await.unwrap();
        warehouse.write("TITLES", &batch).await.unwrap();

        let content = std::fs::read_to_string(warehouse.table_path("TITLES")).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["TITLE"], "The Office");
        assert_eq!(lines[0]["DURATION_MINUTES"], 840);
        assert!(lines[1]["DURATION_MINUTES"].is_null());
    }
}
