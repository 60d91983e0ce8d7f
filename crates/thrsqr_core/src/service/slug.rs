//! Cosmetic URL segment derived from an event title.
//!
//! # Invariants
//! - Output only contains `[a-z0-9-]`, with no leading, trailing or repeated `-`.
//! - `slug_from(slug_from(x)) == slug_from(x)`.
//! - Slugs are never lookup keys; collisions are irrelevant.

use once_cell::sync::Lazy;
use regex::Regex;

static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s_-]+").expect("valid slug filter regex"));
static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s_-]+").expect("valid slug separator regex"));

/// Normalizes `title` into a lowercase, hyphen-delimited token.
///
/// Rules:
/// - ASCII letters are lowercased, every other non-alphanumeric character is dropped.
/// - Runs of whitespace, `_` and `-` collapse into one `-`.
/// - Leading and trailing `-` are trimmed.
pub fn slug_from(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = DISALLOWED_RE.replace_all(&lowered, "");
    let hyphenated = SEPARATOR_RE.replace_all(&stripped, "-");
    hyphenated.trim_matches('-').to_string()
}
