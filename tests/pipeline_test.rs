use anyhow::Result;
use catalog_etl::constants::OUTPUT_COLUMNS;
use catalog_etl::normalize::{Normalizer, Stage};
use catalog_etl::pipeline::{Pipeline, SkipReason, SourceOutcome};
use catalog_etl::source::CsvSourceReader;
use catalog_etl::storage::{JsonLinesWarehouse, SqliteWarehouse};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const HEADER: &str = "title,type,release_year,genre,duration,country,rating,imdb_score,added_date";

fn write_csv(dir: &Path, name: &str, lines: &[&str]) -> Result<String> {
    let path = dir.join(name);
    fs::write(&path, lines.join("\n"))?;
    Ok(path.to_string_lossy().to_string())
}

#[tokio::test]
async fn test_three_sources_into_sqlite() -> Result<()> {
    let dir = tempdir()?;
    let first = write_csv(
        dir.path(),
        "netflix_1.csv",
        &[
            HEADER,
            "the 0ffice,tv show,2005,Cmedy,7 Seasons,Unted States,tv14,8.8,2021-01-01",
            "1nception,movie,2010,Scifi,2h 28m,Unted Kngdm,PG13,8.8,2020-06-15",
        ],
    )?;
    // No COUNTRY/RATING/IMDB_SCORE/ADDED_DATE: cleaning stops at the country stage
    let second = write_csv(
        dir.path(),
        "netflix_2.csv",
        &["title,type,release_year,genre,duration", "dark,tv show,2017,thrller,3 seasons"],
    )?;
    let third = write_csv(
        dir.path(),
        "netflix_3.csv",
        &[HEADER, "parasite,movie,2019,,132 min,suth krea,R,8.5,not a date"],
    )?;

    let db_path = dir.path().join("warehouse").join("catalog.db");
    let mut pipeline = Pipeline::new(
        Box::new(CsvSourceReader::new()),
        Box::new(SqliteWarehouse::open(&db_path)?),
        Normalizer::with_seed(11),
        "NETFLIX_TITLES",
    );

    let report = pipeline
        .run(&[Some(first), None, Some(second), Some(third)])
        .await;

    assert_eq!(report.sources.len(), 4);
    assert_eq!(
        report.sources[0].outcome,
        SourceOutcome::Loaded { rows: 2, columns: 9 }
    );
    assert_eq!(
        report.sources[1].outcome,
        SourceOutcome::Skipped {
            reason: SkipReason::MissingLocation
        }
    );
    // The partial batch carries DURATION_MINUTES, which the table already has,
    // so it is appended as-is.
    assert!(matches!(
        report.sources[2].outcome,
        SourceOutcome::Partial { stage: Stage::Country, rows: 1, .. }
    ));
    assert_eq!(
        report.sources[3].outcome,
        SourceOutcome::Loaded { rows: 1, columns: 9 }
    );
    assert_eq!(report.sources[3].genre_fallbacks, 1);
    assert!(report.has_failures());

    let conn = rusqlite::Connection::open(&db_path)?;
    let office: (String, String, i64, String, i64, String, String, f64, String) = conn.query_row(
        "SELECT TITLE, TYPE, RELEASE_YEAR, GENRE, DURATION_MINUTES, COUNTRY, RATING, IMDB_SCORE, ADDED_DATE \
         FROM NETFLIX_TITLES WHERE TITLE = 'The Office'",
        [],
        |r| {
            Ok((
                r.get(0)?,
                r.get(1)?,
                r.get(2)?,
                r.get(3)?,
                r.get(4)?,
                r.get(5)?,
                r.get(6)?,
                r.get(7)?,
                r.get(8)?,
            ))
        },
    )?;
    assert_eq!(
        office,
        (
            "The Office".to_string(),
            "TV Show".to_string(),
            2005,
            "Comedy".to_string(),
            840,
            "United States".to_string(),
            "TV-14".to_string(),
            8.8,
            "2021-01-01 00:00:00".to_string()
        )
    );

    let dark: (String, Option<String>, i64) = conn.query_row(
        "SELECT GENRE, COUNTRY, DURATION_MINUTES FROM NETFLIX_TITLES WHERE TITLE = 'Dark'",
        [],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;
    assert_eq!(dark, ("Thriller".to_string(), None, 360));

    let parasite: (String, String, Option<String>) = conn.query_row(
        "SELECT GENRE, COUNTRY, ADDED_DATE FROM NETFLIX_TITLES WHERE TITLE = 'Parasite'",
        [],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;
    assert!(["Sci-Fi", "Comedy", "Action", "Thriller", "Horror"].contains(&parasite.0.as_str()));
    assert_eq!(parasite.1, "South Korea");
    assert_eq!(parasite.2, None);

    let total: i64 = conn.query_row("SELECT COUNT(*) FROM NETFLIX_TITLES", [], |r| r.get(0))?;
    assert_eq!(total, 4);
    Ok(())
}

#[tokio::test]
async fn test_unreadable_source_is_skipped_and_run_succeeds() -> Result<()> {
    let dir = tempdir()?;
    let good = write_csv(
        dir.path(),
        "good.csv",
        &[HEADER, "narcos,tv show,2015,drama,3 seasons,unted states,tvma,8.8,2020-01-01"],
    )?;
    let header_only = write_csv(dir.path(), "empty.csv", &[HEADER])?;
    let out_dir = dir.path().join("out");

    let warehouse = JsonLinesWarehouse::new(&out_dir);
    let mut pipeline = Pipeline::new(
        Box::new(CsvSourceReader::new()),
        Box::new(warehouse.clone()),
        Normalizer::with_seed(2),
        "TITLES",
    );

    let missing = dir.path().join("nope.csv").to_string_lossy().to_string();
    let report = pipeline
        .run(&[Some(missing), Some(header_only), Some(good)])
        .await;

    assert_eq!(report.count("skipped"), 2);
    assert_eq!(report.count("loaded"), 1);
    assert!(!report.has_failures());

    let content = fs::read_to_string(warehouse.table_path("TITLES"))?;
    let record: serde_json::Value = serde_json::from_str(content.trim())?;
    assert_eq!(record["TITLE"], "Narcos");
    assert_eq!(record["RATING"], "TV-MA");
    assert_eq!(record["DURATION_MINUTES"], 360);
    assert_eq!(record["ADDED_DATE"], "2020-01-01T00:00:00");
    Ok(())
}

#[tokio::test]
async fn test_partial_first_source_does_not_block_clean_sources() -> Result<()> {
    let dir = tempdir()?;
    // No GENRE column: cleaning stops before DURATION is converted
    let partial = write_csv(
        dir.path(),
        "netflix_1.csv",
        &[
            "title,type,release_year,duration,country,rating,imdb_score,added_date",
            "dark,tv show,2017,3 seasons,germany,tvma,8.7,2020-12-01",
        ],
    )?;
    let clean = write_csv(
        dir.path(),
        "netflix_2.csv",
        &[HEADER, "the 0ffice,tv show,2005,Cmedy,7 Seasons,Unted States,tv14,8.8,2021-01-01"],
    )?;

    let db_path = dir.path().join("catalog.db");
    let mut pipeline = Pipeline::new(
        Box::new(CsvSourceReader::new()),
        Box::new(SqliteWarehouse::open(&db_path)?),
        Normalizer::with_seed(5),
        "T",
    );

    let report = pipeline.run(&[Some(partial), Some(clean)]).await;

    assert!(matches!(
        report.sources[0].outcome,
        SourceOutcome::Partial { stage: Stage::Genre, rows: 1, .. }
    ));
    assert_eq!(
        report.sources[1].outcome,
        SourceOutcome::Loaded { rows: 1, columns: 9 }
    );

    let warehouse = SqliteWarehouse::open(&db_path)?;
    assert_eq!(warehouse.table_columns("T")?, OUTPUT_COLUMNS);
    assert_eq!(warehouse.count_rows("T")?, 2);

    let conn = rusqlite::Connection::open(&db_path)?;
    let dark: (Option<String>, Option<i64>, String) = conn.query_row(
        "SELECT GENRE, DURATION_MINUTES, COUNTRY FROM T WHERE TITLE = 'Dark'",
        [],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;
    assert_eq!(dark, (None, None, "germany".to_string()));

    let office: (String, i64) = conn.query_row(
        "SELECT GENRE, DURATION_MINUTES FROM T WHERE TITLE = 'The Office'",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    assert_eq!(office, ("Comedy".to_string(), 840));
    Ok(())
}
