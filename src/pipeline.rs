use crate::normalize::{Normalizer, Stage};
use crate::source::SourceReader;
use crate::storage::WarehouseWriter;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingLocation,
    EmptyBatch,
}

/// How one source ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Skipped {
        reason: SkipReason,
    },
    Loaded {
        rows: usize,
        columns: usize,
    },
    /// Normalization stopped part-way; the partial batch was still written.
    Partial {
        rows: usize,
        columns: usize,
        stage: Stage,
        error: String,
    },
    WriteFailed {
        error: String,
    },
}

impl SourceOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SourceOutcome::Partial { .. } | SourceOutcome::WriteFailed { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceOutcome::Skipped { .. } => "skipped",
            SourceOutcome::Loaded { .. } => "loaded",
            SourceOutcome::Partial { .. } => "partial",
            SourceOutcome::WriteFailed { .. } => "write_failed",
        }
    }

    pub fn rows_written(&self) -> usize {
        match self {
            SourceOutcome::Loaded { rows, .. } | SourceOutcome::Partial { rows, .. } => *rows,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    /// 1-based position in the configured source list
    pub position: usize,
    pub location: Option<String>,
    pub outcome: SourceOutcome,
    pub genre_fallbacks: usize,
    pub duration_ms: u128,
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub table: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
}

impl PipelineReport {
    pub fn has_failures(&self) -> bool {
        self.sources.iter().any(|s| s.outcome.is_failure())
    }

    pub fn rows_written(&self) -> usize {
        self.sources.iter().map(|s| s.outcome.rows_written()).sum()
    }

    pub fn count(&self, label: &str) -> usize {
        self.sources
            .iter()
            .filter(|s| s.outcome.label() == label)
            .count()
    }
}

/// Drives read → normalize → write for each configured source, one at a time.
pub struct Pipeline {
    reader: Box<dyn SourceReader>,
    writer: Box<dyn WarehouseWriter>,
    normalizer: Normalizer,
    table: String,
}

impl Pipeline {
    pub fn new(
        reader: Box<dyn SourceReader>,
        writer: Box<dyn WarehouseWriter>,
        normalizer: Normalizer,
        table: impl Into<String>,
    ) -> Self {
        Self {
            reader,
            writer,
            normalizer,
            table: table.into(),
        }
    }

    /// Processes `sources` in order.
    ///
    /// Every source gets its own outcome: a skipped, partially cleaned or
    /// unwritable source is recorded and the loop moves on to the next one.
    pub async fn run(&mut self, sources: &[Option<String>]) -> PipelineReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", run_id = %run_id, table = %self.table);
        self.run_sources(run_id, sources).instrument(span).await
    }

    async fn run_sources(&mut self, run_id: Uuid, sources: &[Option<String>]) -> PipelineReport {
        let started_at = Utc::now();
        info!("PIPELINE STARTED");
        info!(
            "Loading {} configured source(s) into {} ({})",
            sources.len(),
            self.table,
            self.writer.describe()
        );

        let mut reports = Vec::with_capacity(sources.len());
        for (i, location) in sources.iter().enumerate() {
            let position = i + 1;
            let span = info_span!("source", position, location = location.as_deref().unwrap_or("<unset>"));
            let t_source = Instant::now();

            let (outcome, genre_fallbacks) = self
                .process_source(location.as_deref())
                .instrument(span)
                .await;

            let elapsed = t_source.elapsed();
            counter!("catalog_sources_total", "outcome" => outcome.label()).increment(1);
            counter!("catalog_rows_written_total").increment(outcome.rows_written() as u64);
            histogram!("catalog_source_duration_seconds").record(elapsed.as_secs_f64());

            reports.push(SourceReport {
                position,
                location: location.clone(),
                outcome,
                genre_fallbacks,
                duration_ms: elapsed.as_millis(),
            });
        }

        let report = PipelineReport {
            run_id,
            table: self.table.clone(),
            started_at,
            finished_at: Utc::now(),
            sources: reports,
        };

        if report.has_failures() {
            error!(
                "PIPELINE COMPLETED WITH FAILURES: {} loaded, {} partial, {} write failures, {} skipped",
                report.count("loaded"),
                report.count("partial"),
                report.count("write_failed"),
                report.count("skipped")
            );
        } else {
            info!(
                "PIPELINE COMPLETED SUCCESSFULLY: {} loaded, {} skipped, {} rows written",
                report.count("loaded"),
                report.count("skipped"),
                report.rows_written()
            );
        }
        report
    }

    /// Returns the outcome and the number of fabricated genres.
    async fn process_source(&mut self, location: Option<&str>) -> (SourceOutcome, usize) {
        let Some(location) = location else {
            warn!("Skipping missing source location");
            return (
                SourceOutcome::Skipped {
                    reason: SkipReason::MissingLocation,
                },
                0,
            );
        };

        info!("Extracting data from: {}", location);
        let batch = self.reader.read(location).await;
        if batch.is_empty() {
            warn!("No data extracted from {}", location);
            return (
                SourceOutcome::Skipped {
                    reason: SkipReason::EmptyBatch,
                },
                0,
            );
        }

        let outcome = self.normalizer.normalize(batch);
        let (rows, columns) = outcome.batch.shape();
        info!("Transformed batch shape: ({}, {})", rows, columns);

        // Incremental load: one write per source, partial batches included
        if let Err(e) = self.writer.write(&self.table, &outcome.batch).await {
            error!("Load failed for {}: {}", location, e);
            return (
                SourceOutcome::WriteFailed {
                    error: e.to_string(),
                },
                outcome.genre_fallbacks,
            );
        }
        info!("Loaded {} rows from {} into {}", rows, location, self.table);

        let result = match outcome.failure {
            Some(failure) => {
                warn!(
                    "Wrote partially cleaned batch from {}: stopped at stage {}",
                    location, failure.stage
                );
                SourceOutcome::Partial {
                    rows,
                    columns,
                    stage: failure.stage,
                    error: failure.error.to_string(),
                }
            }
            None => SourceOutcome::Loaded { rows, columns },
        };
        (result, outcome.genre_fallbacks)
    }
}
