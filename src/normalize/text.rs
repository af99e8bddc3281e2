use once_cell::sync::Lazy;
use regex::Regex;

static NON_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z\s]").expect("valid regex"));
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("valid regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Upper-cases the first letter of every letter run and lower-cases the rest.
///
/// Any non-letter starts a new word, so `"o'neil"` becomes `"O'Neil"` and
/// `"2nd"` becomes `"2Nd"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Keeps ASCII letters and whitespace only.
pub fn letters_only(s: &str) -> String {
    NON_LETTER.replace_all(s, "").into_owned()
}

/// Keeps ASCII letters, digits and whitespace only.
pub fn alphanumeric_only(s: &str) -> String {
    NON_ALNUM.replace_all(s, "").into_owned()
}

pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s, " ").into_owned()
}
