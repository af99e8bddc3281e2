use crate::constants::{
    DEFAULT_DESTINATION, DEFAULT_LOG_DIR, DEFAULT_TABLE, DESTINATION_ENV, GENRE_SEED_ENV,
    LOG_DIR_ENV, SOURCE_ENV_VARS, TABLE_ENV,
};
use crate::error::{EtlError, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Where cleaned batches go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Sqlite(PathBuf),
    JsonLines(PathBuf),
    Memory,
}

impl FromStr for Destination {
    type Err = EtlError;

    /// `sqlite:<file>`, `jsonl:<dir>` or `memory`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "memory" {
            return Ok(Destination::Memory);
        }
        match s.split_once(':') {
            Some(("sqlite", path)) if !path.is_empty() => Ok(Destination::Sqlite(path.into())),
            Some(("jsonl", path)) if !path.is_empty() => Ok(Destination::JsonLines(path.into())),
            _ => Err(EtlError::Config(format!(
                "unrecognised destination '{}', expected sqlite:<file>, jsonl:<dir> or memory",
                s
            ))),
        }
    }
}

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Source locations in processing order; unset entries stay as `None`.
    pub sources: Vec<Option<String>>,
    pub destination: Destination,
    pub table: String,
    pub genre_seed: Option<u64>,
    pub log_dir: PathBuf,
}

impl PipelineConfig {
    /// Reads settings from the environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let sources: Vec<Option<String>> = SOURCE_ENV_VARS.iter().map(|key| get(*key)).collect();

        let destination: Destination = get(DESTINATION_ENV)
            .as_deref()
            .unwrap_or(DEFAULT_DESTINATION)
            .parse()?;

        let genre_seed = match get(GENRE_SEED_ENV) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                EtlError::Config(format!("{} must be an unsigned integer: {}", GENRE_SEED_ENV, e))
            })?),
            None => None,
        };

        Ok(Self {
            sources,
            destination,
            table: get(TABLE_ENV).unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            genre_seed,
            log_dir: get(LOG_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())
                .into(),
        })
    }
}
