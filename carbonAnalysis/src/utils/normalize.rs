//! Coercion helpers shared by every loader.
//!
//! Each column class gets exactly one function: column names go through
//! [`normalize_column_name`], period keys through [`normalize_year_key`] and
//! measurement cells through [`parse_measurement`].

use deunicode::deunicode;

/// Transliterates a raw header into a lowercase ASCII snake-case name.
///
/// Symbols (`°`, `,`, `(`, `/`...) become separators before transliteration so
/// that `(°C)` yields `c` rather than `degc`. The result is stable under a
/// second application.
pub fn normalize_column_name(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    deunicode(&spaced)
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Coerces a period cell into a 4-digit year string.
///
/// Accepts `2020`, ` 2020 `, `2020.0` (spreadsheet floats) and anything that
/// starts with a 4-digit year followed by a date separator (`2020-01-31`).
pub fn normalize_year_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let integral = match trimmed.split_once('.') {
        Some((head, tail)) if tail.chars().all(|c| c == '0') => head,
        Some(_) => return None,
        None => trimmed,
    };

    if integral.len() == 4 && integral.chars().all(|c| c.is_ascii_digit()) {
        return Some(integral.to_string());
    }

    let bytes = trimmed.as_bytes();
    if bytes.len() > 4
        && bytes[..4].iter().all(|b| b.is_ascii_digit())
        && matches!(bytes[4], b'-' | b'/')
    {
        return Some(trimmed[..4].to_string());
    }

    None
}

/// Parses a year key back into an integer year.
pub fn year_number(key: &str) -> Option<i32> {
    normalize_year_key(key).and_then(|y| y.parse().ok())
}

/// Parses a measurement cell, treating decimal commas as points.
///
/// Empty cells, `null`, `NaN` and anything unparsable are missing.
pub fn parse_measurement(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
