use crate::constants::{MINUTES_PER_EPISODE, MINUTES_PER_SEASON};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// One pattern of the free-text duration grammar and how to turn its captures
/// into minutes.
struct DurationRule {
    pattern: Regex,
    minutes: fn(&Captures<'_>) -> Option<i64>,
}

fn number(caps: &Captures<'_>, group: usize) -> Option<i64> {
    caps.get(group)?.as_str().parse().ok()
}

// Checked first to last, first match wins. Keep the order.
static DURATION_RULES: Lazy<Vec<DurationRule>> = Lazy::new(|| {
    let rule = |pattern: &str, minutes: fn(&Captures<'_>) -> Option<i64>| DurationRule {
        pattern: Regex::new(pattern).expect("valid duration pattern"),
        minutes,
    };
    vec![
        // "2h 30m"
        rule(r"^([0-9]+)h\s*([0-9]+)m", |c| {
            number(c, 1)?.checked_mul(60)?.checked_add(number(c, 2)?)
        }),
        // "1h"
        rule(r"^([0-9]+)h$", |c| number(c, 1)?.checked_mul(60)),
        // "90 min", "90 mins"
        rule(r"^([0-9]+)\s*min", |c| number(c, 1)),
        // "4 episodes"
        rule(r"^([0-9]+)\s*episodes?", |c| {
            number(c, 1)?.checked_mul(MINUTES_PER_EPISODE)
        }),
        // "2 seasons"
        rule(r"^([0-9]+)\s*seasons?", |c| {
            number(c, 1)?.checked_mul(MINUTES_PER_SEASON)
        }),
    ]
});

/// Converts a free-text duration into minutes, or `None` when no rule matches.
pub fn parse_duration_minutes(raw: &str) -> Option<i64> {
    let text = raw.trim().to_lowercase();
    DURATION_RULES
        .iter()
        .find_map(|rule| rule.pattern.captures(&text).map(|caps| (rule.minutes)(&caps)))
        .flatten()
}
