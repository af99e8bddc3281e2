use crate::error::{EtlError, Result};
use crate::types::{Batch, Value};
use async_trait::async_trait;
use std::io::Read;
use std::path::Path;
use tracing::{error, info, instrument, warn};

/// Turns a source location into a batch.
///
/// Implementations never fail outward: any problem is logged and reported as
/// an empty batch, which the pipeline skips.
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn read(&self, location: &str) -> Batch;
}

/// Reads CSV with a header row from a local path or an `http(s)://` URL.
#[derive(Debug, Default, Clone)]
pub struct CsvSourceReader;

impl CsvSourceReader {
    pub fn new() -> Self {
        Self
    }

    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        if is_remote(location) {
            let resp = reqwest::get(location).await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(EtlError::HttpStatus {
                    status: status.as_u16(),
                    location: location.to_string(),
                });
            }
            Ok(resp.bytes().await?.to_vec())
        } else {
            Ok(tokio::fs::read(Path::new(location)).await?)
        }
    }
}

#[async_trait]
impl SourceReader for CsvSourceReader {
    #[instrument(skip(self))]
    async fn read(&self, location: &str) -> Batch {
        info!("-------------------------------------------");
        info!("EXTRACTING THE DATA");
        info!("Started Extracting Data from {}", location);

        let result = match self.fetch(location).await {
            Ok(bytes) => parse_csv(bytes.as_slice()),
            Err(e) => Err(e),
        };

        let batch = match result {
            Ok(batch) if batch.is_empty() => {
                warn!("Extracted batch is empty from {}", location);
                batch
            }
            Ok(batch) => {
                info!("Successfully Extracted {} rows from {}", batch.len(), location);
                batch
            }
            Err(e) => {
                error!("Extraction failed for {}: {}", location, e);
                Batch::empty()
            }
        };
        info!("---------------------------------------------");
        batch
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Parses CSV with a header row. Blank fields become nulls; ragged rows are
/// padded or truncated to the header width.
pub fn parse_csv<R: Read>(input: R) -> Result<Batch> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let columns: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    Value::Null
                } else {
                    Value::text(field)
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(Batch::new(columns, rows))
}
