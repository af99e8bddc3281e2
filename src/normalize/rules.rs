//! Per-cell cleaning rules. Each takes one cell and returns its cleaned value;
//! the engine applies them column-wise.

use super::text::{alphanumeric_only, collapse_whitespace, letters_only, title_case};
use crate::constants::{correct, COUNTRY_TYPOS, GENRE_TYPOS, RATING_TYPOS};
use crate::types::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%d-%b-%y"];

pub fn clean_title(cell: Value) -> Value {
    let Some(raw) = cell.into_text() else {
        return Value::Null;
    };
    let swapped = raw.trim().replace('0', "o").replace('1', "i");
    let letters = letters_only(&title_case(&swapped));
    // Stripping can join words ("Spider-Man"), so case again afterwards
    Value::Text(title_case(collapse_whitespace(&letters).trim()))
}

/// Only text cells are cleaned; anything else becomes null.
pub fn clean_type(cell: Value) -> Value {
    match cell {
        Value::Text(raw) => Value::Text(title_case(&raw).trim().replace("Tv", "TV")),
        _ => Value::Null,
    }
}

/// Four-digit years only; already-numeric years are kept.
pub fn parse_release_year(cell: Value) -> Value {
    let year = match cell {
        Value::Text(raw) => {
            let raw = raw.trim();
            if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
                raw.parse::<i64>().ok()
            } else {
                None
            }
        }
        Value::Int(y) => Some(y),
        Value::Float(f) if f.fract() == 0.0 => Some(f as i64),
        _ => None,
    };
    year.filter(|y| (1000..=9999).contains(y)).into()
}

/// Cleans and corrects a genre. Returns `None` when nothing usable is left, in
/// which case the engine fills the cell.
pub fn clean_genre(cell: Value) -> Option<String> {
    let raw = cell.into_text()?;
    let cleaned = title_case(&letters_only(&raw)).trim().to_string();
    let corrected = correct(&GENRE_TYPOS, cleaned);
    (!corrected.is_empty()).then_some(corrected)
}

pub fn clean_country(cell: Value) -> Value {
    let Some(raw) = cell.into_text() else {
        return Value::Null;
    };
    let cleaned = title_case(&letters_only(&raw)).trim().to_string();
    Value::Text(correct(&COUNTRY_TYPOS, cleaned))
}

/// Unknown codes pass through stripped and upper-cased.
pub fn clean_rating(cell: Value) -> Value {
    let Some(raw) = cell.into_text() else {
        return Value::Null;
    };
    let cleaned = alphanumeric_only(&raw).trim().to_uppercase();
    Value::Text(correct(&RATING_TYPOS, cleaned))
}

pub fn parse_imdb_score(cell: Value) -> Value {
    let score = match cell {
        Value::Text(raw) => raw.trim().parse::<f64>().ok(),
        Value::Int(i) => Some(i as f64),
        Value::Float(f) => Some(f),
        _ => None,
    };
    score.filter(|f| f.is_finite()).map_or(Value::Null, Value::Float)
}

pub fn parse_added_date(cell: Value) -> Value {
    match cell {
        Value::Timestamp(ts) => Value::Timestamp(ts),
        Value::Text(raw) => parse_timestamp(raw.trim()).map_or(Value::Null, Value::Timestamp),
        _ => Value::Null,
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
