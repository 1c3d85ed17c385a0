//! Validation and formatting for `stat:sum:<key>:<value>` comments.
//!
//! Merging files sums matching keys across inputs (§4.8); the rules for
//! what counts as a well-formed key and value come from
//! `examples/original_source/tests/scripts/statsum.py`, which is more
//! precise than the prose description: a key must start with an ASCII
//! letter (not an underscore, despite the informally-stated regex
//! suggesting otherwise -- see DESIGN.md), and a value occupies a fixed
//! 24-character field.

use crate::error::{Error, Result};

const VALUE_FIELD_WIDTH: usize = 24;
const MAX_KEY_LEN: usize = 64;

/// Whether `key` is a legal stat:sum key: starts with an ASCII letter,
/// followed by up to 63 letters, digits, or underscores.
pub fn is_valid_key(key: &str) -> bool {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return false;
    }
    let mut chars = key.chars();
    let first = chars.next().unwrap();
    if !first.is_ascii_alphabetic() {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `value` can be represented in the fixed-width value field: it
/// must be finite and its shortest round-tripping decimal representation
/// must fit in [`VALUE_FIELD_WIDTH`] characters.
pub fn is_valid_value(value: f64) -> bool {
    if !value.is_finite() {
        return false;
    }
    format_value(value).map(|s| s.len() <= VALUE_FIELD_WIDTH).unwrap_or(false)
}

fn format_value(value: f64) -> Option<String> {
    // Shortest representation that parses back to the same bits, the way
    // Rust's own `f64` Display already guarantees, capped to the field
    // width by falling back to shorter significant-digit counts.
    let full = format!("{value}");
    if full.len() <= VALUE_FIELD_WIDTH {
        return Some(full);
    }
    for precision in (1..17).rev() {
        let candidate = format!("{value:.precision$e}");
        if candidate.len() <= VALUE_FIELD_WIDTH {
            return Some(candidate);
        }
    }
    None
}

/// Formats `key:value` as the text that follows the `stat:sum:` prefix,
/// validating both halves.
pub fn format_entry(key: &str, value: f64) -> Result<String> {
    if !is_valid_key(key) {
        return Err(Error::InvalidConfig(format!(
            "invalid stat:sum key {:?}: must start with a letter and contain only letters, digits, and underscores",
            key
        )));
    }
    let formatted = format_value(value).ok_or_else(|| {
        Error::InvalidConfig(format!(
            "stat:sum value {} cannot be represented in {} characters",
            value, VALUE_FIELD_WIDTH
        ))
    })?;
    Ok(format!("{key}:{formatted}"))
}

/// Parses `key:value` text (the part of a comment after the `stat:sum:`
/// prefix) into a validated `(key, value)` pair, or `None` if either half
/// is malformed.
pub fn parse_entry(rest: &str) -> Option<(String, f64)> {
    let (key, value) = rest.split_once(':')?;
    if !is_valid_key(key) {
        return None;
    }
    let value = parse_value(value)?;
    Some((key.to_string(), value))
}

/// Parses a stat:sum value field leniently, for read-side use where the
/// comment has already been written and only needs to be understood
/// (`Header::stat_sum`), not validated against the write-time rules.
pub fn parse_value(value: &str) -> Option<f64> {
    let trimmed = value.trim_end();
    let parsed: f64 = trimmed.parse().ok()?;
    if parsed.is_finite() {
        Some(parsed)
    } else {
        None
    }
}

/// Sums two stat:sum maps, keeping keys present in only one side.
pub fn merge(
    a: &std::collections::HashMap<String, Option<f64>>,
    b: &std::collections::HashMap<String, Option<f64>>,
) -> std::collections::HashMap<String, Option<f64>> {
    let mut out = a.clone();
    for (key, value) in b {
        out.entry(key.clone())
            .and_modify(|existing| {
                *existing = match (*existing, *value) {
                    (Some(x), Some(y)) => Some(x + y),
                    _ => None,
                };
            })
            .or_insert(*value);
    }
    out
}
