//! Lexical timestamp check for the `timestamp` column.
//!
//! Two encodings are accepted:
//!
//! - ISO 8601 date-time with a `T` or space separator, optional fractional
//!   seconds, and an optional `Z` or `±HH:MM` / `±HHMM` offset
//! - Unix epoch as 10 to 13 ASCII digits (seconds or milliseconds)
//!
//! Field values are not range checked: `2024-13-45T99:99:99` passes.

use regex::Regex;
use std::sync::LazyLock;

static ISO8601_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[0-9]{4}-[0-9]{2}-[0-9]{2}[T ][0-9]{2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]+)?(?:Z|[+-][0-9]{2}:?[0-9]{2})?$",
    )
    .expect("ISO 8601 pattern is a valid regex")
});

static EPOCH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10,13}$").expect("epoch pattern is a valid regex"));

/// Returns true when `value`, trimmed, is an ISO 8601 or Unix epoch timestamp.
pub fn is_valid_timestamp(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }

    ISO8601_PATTERN.is_match(value) || EPOCH_PATTERN.is_match(value)
}
