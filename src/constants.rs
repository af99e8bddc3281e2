//! Column names and lookup tables shared by the reader, engine and writers.
use once_cell::sync::Lazy;
use std::collections::HashMap;

// Catalog columns (after upper-casing)
pub const TITLE: &str = "TITLE";
pub const TYPE: &str = "TYPE";
pub const RELEASE_YEAR: &str = "RELEASE_YEAR";
pub const GENRE: &str = "GENRE";
pub const DURATION: &str = "DURATION";
pub const DURATION_MINUTES: &str = "DURATION_MINUTES";
pub const COUNTRY: &str = "COUNTRY";
pub const RATING: &str = "RATING";
pub const IMDB_SCORE: &str = "IMDB_SCORE";
pub const ADDED_DATE: &str = "ADDED_DATE";

/// Columns of a fully normalized batch, in warehouse order.
pub const OUTPUT_COLUMNS: [&str; 9] = [
    TITLE,
    TYPE,
    RELEASE_YEAR,
    GENRE,
    DURATION_MINUTES,
    COUNTRY,
    RATING,
    IMDB_SCORE,
    ADDED_DATE,
];

// Source locations, in processing order
pub const SOURCE_ENV_VARS: [&str; 3] = ["NETFLIX_FILE1", "NETFLIX_FILE2", "NETFLIX_FILE3"];
pub const DESTINATION_ENV: &str = "CATALOG_DESTINATION";
pub const TABLE_ENV: &str = "CATALOG_TABLE";
pub const GENRE_SEED_ENV: &str = "CATALOG_GENRE_SEED";
pub const LOG_DIR_ENV: &str = "CATALOG_LOG_DIR";

pub const DEFAULT_DESTINATION: &str = "sqlite:warehouse/catalog.db";
pub const DEFAULT_TABLE: &str = "NETFLIX_TITLES";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Minutes credited per episode / per season when only a count is known.
pub const MINUTES_PER_EPISODE: i64 = 30;
pub const MINUTES_PER_SEASON: i64 = 120;

/// Genres a missing GENRE is filled from.
pub const FALLBACK_GENRES: [&str; 5] = ["Sci-Fi", "Comedy", "Action", "Thriller", "Horror"];

pub static GENRE_TYPOS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Hrrr", "Horror"),
        ("Anmatn", "Animation"),
        ("Cmedy", "Comedy"),
        ("Thrller", "Thriller"),
        ("Actn", "Action"),
        ("Scf", "Sci-Fi"),
        ("Dcumentary", "Documentary"),
        ("Scifi", "Sci-Fi"),
    ])
});

pub static COUNTRY_TYPOS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Suth Krea", "South Korea"),
        ("Unted Kngdm", "United Kingdom"),
        ("Unted States", "United States"),
        ("Brazl", "Brazil"),
        ("Australa", "Australia"),
        ("Inda", "India"),
    ])
});

pub static RATING_TYPOS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("PG13", "PG-13"),
        ("TVPG", "TV-PG"),
        ("TV14", "TV-14"),
        ("TVMA", "TV-MA"),
        ("TVY7", "TV-Y7"),
        ("R", "R"),
        ("G", "G"),
        ("PG", "PG"),
    ])
});

/// Look up an exact-match correction, passing unknown values through.
pub fn correct(table: &HashMap<&'static str, &'static str>, value: String) -> String {
    match table.get(value.as_str()) {
        Some(fixed) => (*fixed).to_string(),
        None => value,
    }
}
