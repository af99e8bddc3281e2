//! Field-normalization engine.
//!
//! A [`Normalizer`] runs a fixed, ordered list of [`Stage`]s over a [`Batch`].
//! The first stage that fails ends the pass: stages already applied stay
//! applied, later ones are skipped, and the caller gets the partially cleaned
//! batch back together with a record of what ran.

pub mod duration;
pub mod rules;
pub mod text;

use crate::constants::{
    ADDED_DATE, COUNTRY, DURATION, DURATION_MINUTES, FALLBACK_GENRES, GENRE, IMDB_SCORE, RATING,
    RELEASE_YEAR, TITLE, TYPE,
};
use crate::error::{EtlError, Result};
use crate::types::{Batch, Value};
use metrics::counter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, warn};

/// One normalization rule, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    UppercaseColumns,
    Title,
    Type,
    ReleaseYear,
    Genre,
    Duration,
    Country,
    Rating,
    ImdbScore,
    AddedDate,
}

impl Stage {
    pub const ALL: [Stage; 10] = [
        Stage::UppercaseColumns,
        Stage::Title,
        Stage::Type,
        Stage::ReleaseYear,
        Stage::Genre,
        Stage::Duration,
        Stage::Country,
        Stage::Rating,
        Stage::ImdbScore,
        Stage::AddedDate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::UppercaseColumns => "uppercase_columns",
            Stage::Title => "title",
            Stage::Type => "type",
            Stage::ReleaseYear => "release_year",
            Stage::Genre => "genre",
            Stage::Duration => "duration",
            Stage::Country => "country",
            Stage::Rating => "rating",
            Stage::ImdbScore => "imdb_score",
            Stage::AddedDate => "added_date",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The stage that stopped a pass and why.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: EtlError,
}

/// Result of one engine pass.
#[derive(Debug)]
pub struct NormalizeOutcome {
    /// The batch as it stood when the pass ended.
    pub batch: Batch,
    pub completed: Vec<Stage>,
    pub failure: Option<StageFailure>,
    /// GENRE cells filled from the fallback list.
    pub genre_fallbacks: usize,
}

impl NormalizeOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Stages that never ran because an earlier one failed.
    pub fn skipped(&self) -> Vec<Stage> {
        Stage::ALL
            .iter()
            .copied()
            .filter(|s| !self.completed.contains(s))
            .filter(|s| self.failure.as_ref().map_or(true, |f| f.stage != *s))
            .collect()
    }
}

/// Cleans catalog batches.
///
/// Owns the random source used to fill missing genres, so a seeded normalizer
/// produces identical output for identical input.
pub struct Normalizer {
    rng: StdRng,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::with_seed)
    }

    pub fn normalize(&mut self, mut batch: Batch) -> NormalizeOutcome {
        info!("DATA CLEANING AND TRANSFORMATIONS STARTED");
        let mut completed = Vec::with_capacity(Stage::ALL.len());
        let mut failure = None;
        let mut genre_fallbacks = 0;

        for stage in Stage::ALL {
            match self.apply(stage, &mut batch, &mut genre_fallbacks) {
                Ok(()) => {
                    debug!(stage = %stage, "stage applied");
                    completed.push(stage);
                }
                Err(e) => {
                    error!(stage = %stage, "Transformation failed: {}", e);
                    counter!("catalog_normalize_failures_total", "stage" => stage.name())
                        .increment(1);
                    failure = Some(StageFailure { stage, error: e });
                    break;
                }
            }
        }

        if genre_fallbacks > 0 {
            warn!(
                "Filled {} missing GENRE values from the fallback list",
                genre_fallbacks
            );
            counter!("catalog_genre_fallbacks_total").increment(genre_fallbacks as u64);
        }
        if failure.is_none() {
            info!("Finished TRANSFORM process successfully");
        }
        info!("DATA CLEANING DONE");
        info!("---------------------------------------------------");

        NormalizeOutcome {
            batch,
            completed,
            failure,
            genre_fallbacks,
        }
    }

    fn apply(&mut self, stage: Stage, batch: &mut Batch, genre_fallbacks: &mut usize) -> Result<()> {
        match stage {
            Stage::UppercaseColumns => {
                batch.rename_columns(|c| c.to_uppercase());
                info!("Standardized column names to uppercase");
                Ok(())
            }
            Stage::Title => batch.map_column(TITLE, rules::clean_title),
            Stage::Type => batch.map_column(TYPE, rules::clean_type),
            Stage::ReleaseYear => batch.map_column(RELEASE_YEAR, rules::parse_release_year),
            Stage::Genre => {
                let rng = &mut self.rng;
                batch.map_column(GENRE, |cell| match rules::clean_genre(cell) {
                    Some(genre) => Value::Text(genre),
                    None => {
                        *genre_fallbacks += 1;
                        let pick = FALLBACK_GENRES[rng.gen_range(0..FALLBACK_GENRES.len())];
                        Value::text(pick)
                    }
                })
            }
            Stage::Duration => convert_duration(batch),
            Stage::Country => batch.map_column(COUNTRY, rules::clean_country),
            Stage::Rating => batch.map_column(RATING, rules::clean_rating),
            Stage::ImdbScore => batch.map_column(IMDB_SCORE, rules::parse_imdb_score),
            Stage::AddedDate => batch.map_column(ADDED_DATE, rules::parse_added_date),
        }
    }
}

/// Replaces DURATION with DURATION_MINUTES.
fn convert_duration(batch: &mut Batch) -> Result<()> {
    // Already converted by an earlier pass
    if !batch.has_column(DURATION) && batch.has_column(DURATION_MINUTES) {
        return Ok(());
    }
    let minutes: Vec<Value> = batch
        .column(DURATION)?
        .into_iter()
        .map(|cell| {
            Value::from(
                cell.clone()
                    .into_text()
                    .and_then(|raw| duration::parse_duration_minutes(&raw)),
            )
        })
        .collect();
    batch.add_column(DURATION_MINUTES, minutes)?;
    batch.drop_column(DURATION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const COLUMNS: [&str; 9] = [
        "title",
        "type",
        "release_year",
        "genre",
        "duration",
        "country",
        "rating",
        "imdb_score",
        "added_date",
    ];

    fn row(values: [&str; 9]) -> Vec<Value> {
        values
            .iter()
            .map(|v| if v.is_empty() { Value::Null } else { Value::text(*v) })
            .collect()
    }

    fn office() -> Vec<Value> {
        row([
            "the 0ffice",
            "tv show",
            "2005",
            "Cmedy",
            "7 Seasons",
            "Unted States",
            "tv14",
            "8.8",
            "2021-01-01",
        ])
    }

    #[test]
    fn test_end_to_end_record() {
        let batch = Batch::from_records(&COLUMNS, vec![office()]);
        let outcome = Normalizer::with_seed(7).normalize(batch);

        assert!(outcome.is_complete());
        assert_eq!(outcome.completed, Stage::ALL.to_vec());
        assert_eq!(outcome.genre_fallbacks, 0);

        let b = &outcome.batch;
        assert!(!b.has_column(DURATION));
        assert_eq!(b.get(0, TITLE), Some(&Value::text("The Office")));
        assert_eq!(b.get(0, TYPE), Some(&Value::text("TV Show")));
        assert_eq!(b.get(0, RELEASE_YEAR), Some(&Value::Int(2005)));
        assert_eq!(b.get(0, GENRE), Some(&Value::text("Comedy")));
        assert_eq!(b.get(0, DURATION_MINUTES), Some(&Value::Int(840)));
        assert_eq!(b.get(0, COUNTRY), Some(&Value::text("United States")));
        assert_eq!(b.get(0, RATING), Some(&Value::text("TV-14")));
        assert_eq!(b.get(0, IMDB_SCORE), Some(&Value::Float(8.8)));
        let expected = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(b.get(0, ADDED_DATE), Some(&Value::Timestamp(expected)));
    }

    #[test]
    fn test_missing_genre_is_always_filled() {
        let mut rows = Vec::new();
        for genre in ["", "  ", "!!", "42"] {
            let mut r = office();
            r[3] = if genre.is_empty() { Value::Null } else { Value::text(genre) };
            rows.push(r);
        }
        let outcome = Normalizer::new().normalize(Batch::from_records(&COLUMNS, rows));

        assert_eq!(outcome.genre_fallbacks, 4);
        for genre in outcome.batch.column(GENRE).unwrap() {
            let genre = genre.as_str().expect("genre must be text");
            assert!(FALLBACK_GENRES.contains(&genre), "{genre}");
        }
    }

    #[test]
    fn test_seeded_fallback_is_deterministic() {
        let rows: Vec<Vec<Value>> = (0..20)
            .map(|_| {
                let mut r = office();
                r[3] = Value::Null;
                r
            })
            .collect();
        let batch = Batch::from_records(&COLUMNS, rows);
        let a = Normalizer::with_seed(42).normalize(batch.clone());
        let b = Normalizer::with_seed(42).normalize(batch);
        assert_eq!(a.batch, b.batch);
    }

    #[test]
    fn test_missing_column_returns_partial_batch() {
        // No COUNTRY column: stages up to duration run, the rest are skipped
        let columns: Vec<&str> = COLUMNS.iter().copied().filter(|c| *c != "country").collect();
        let mut r = office();
        r.remove(5);
        let outcome = Normalizer::with_seed(1).normalize(Batch::from_records(&columns, vec![r]));

        let failure = outcome.failure.as_ref().expect("country stage should fail");
        assert_eq!(failure.stage, Stage::Country);
        assert!(matches!(failure.error, EtlError::MissingColumn(ref c) if c == COUNTRY));
        assert_eq!(outcome.completed.last(), Some(&Stage::Duration));
        assert_eq!(
            outcome.skipped(),
            vec![Stage::Rating, Stage::ImdbScore, Stage::AddedDate]
        );

        let b = &outcome.batch;
        assert_eq!(b.get(0, TITLE), Some(&Value::text("The Office")));
        assert_eq!(b.get(0, DURATION_MINUTES), Some(&Value::Int(840)));
        // untouched by skipped stages
        assert_eq!(b.get(0, RATING), Some(&Value::text("tv14")));
        assert_eq!(b.get(0, IMDB_SCORE), Some(&Value::text("8.8")));
    }

    #[test]
    fn test_renormalizing_output_is_a_fixed_point() {
        let mut second = office();
        second[0] = Value::text("  sci-fi saga 2 ");
        second[3] = Value::text("Scifi");
        second[4] = Value::text("1h 5m");
        second[6] = Value::text("PG13");
        second[8] = Value::text("garbage");
        let batch = Batch::from_records(&COLUMNS, vec![office(), second]);

        let first = Normalizer::with_seed(3).normalize(batch);
        assert!(first.is_complete());
        let again = Normalizer::with_seed(3).normalize(first.batch.clone());
        assert!(again.is_complete());
        assert_eq!(again.batch, first.batch);
    }

    #[test]
    fn test_empty_duration_becomes_null() {
        let mut r = office();
        r[4] = Value::Null;
        let outcome = Normalizer::with_seed(0).normalize(Batch::from_records(&COLUMNS, vec![r]));
        assert_eq!(outcome.batch.get(0, DURATION_MINUTES), Some(&Value::Null));
    }
}
