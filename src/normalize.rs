//! Field normalizers for pasted ledger columns.
//!
//! Both normalizers are total: a token that matches no known format degrades
//! (date passes through as received, amount becomes zero) instead of failing.

use chrono::{Datelike, Local};

/// Month lookup keyed by the first three letters of an English abbreviation
/// or an Indonesian month name.
const MONTHS: &[(&str, &str)] = &[
    ("jan", "01"),
    ("feb", "02"),
    ("mar", "03"),
    ("apr", "04"),
    ("may", "05"),
    ("mei", "05"),
    ("jun", "06"),
    ("jul", "07"),
    ("aug", "08"),
    ("agu", "08"),
    ("sep", "09"),
    ("oct", "10"),
    ("okt", "10"),
    ("nov", "11"),
    ("dec", "12"),
    ("des", "12"),
];

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_iso_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && all_digits(&s[0..4])
        && all_digits(&s[5..7])
        && all_digits(&s[8..10])
}

/// Two-digit years pivot at 70: `70..=99` → 19xx, `00..=69` → 20xx.
fn expand_year(year: &str) -> String {
    if year.len() != 2 {
        return year.to_string();
    }
    match year.parse::<u32>() {
        Ok(y) if y >= 70 => format!("19{year}"),
        _ => format!("20{year}"),
    }
}

fn pad2(s: &str) -> String {
    format!("{s:0>2}")
}

fn is_day_or_month(s: &str) -> bool {
    all_digits(s) && s.len() <= 2
}

fn is_year(s: &str) -> bool {
    all_digits(s) && (s.len() == 2 || s.len() == 4)
}

fn month_from_name(name: &str) -> Option<&'static str> {
    let key: String = name.chars().take(3).collect::<String>().to_lowercase();
    MONTHS.iter().find(|(k, _)| *k == key).map(|(_, m)| *m)
}

// D/M/Y or D-M-Y, separators may be mixed
fn parse_delimited(s: &str) -> Option<String> {
    let parts: Vec<&str> = s.split(['/', '-']).collect();
    let [day, month, year] = parts.as_slice() else { return None };
    if !is_day_or_month(day) || !is_day_or_month(month) || !is_year(year) {
        return None;
    }
    Some(format!("{}-{}-{}", expand_year(year), pad2(month), pad2(day)))
}

// "18 Des 2024", "18 December", "5 mei 24"
fn parse_month_name(s: &str, default_year: i32) -> Option<String> {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    if tokens.len() < 2 || tokens.len() > 3 {
        return None;
    }
    let day = tokens[0];
    if !is_day_or_month(day) {
        return None;
    }
    let month = month_from_name(tokens[1])?;
    let year = match tokens.get(2) {
        Some(y) if is_year(y) => expand_year(y),
        Some(_) => return None,
        None => default_year.to_string(),
    };
    Some(format!("{year}-{month}-{}", pad2(day)))
}

/// Returns the canonical `YYYY-MM-DD` form of `s`, or `None` when no known
/// format matches. Year-less dates take `default_year`.
///
/// Calendar validity is not checked: `31/02/2024` becomes `2024-02-31`.
pub fn parse_date_checked(s: &str, default_year: i32) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if is_iso_date(s) {
        return Some(s.to_string());
    }
    parse_delimited(s).or_else(|| parse_month_name(s, default_year))
}

/// Date normalizer with an explicit year for inputs that omit one.
pub fn normalize_date_in_year(s: &str, default_year: i32) -> String {
    parse_date_checked(s, default_year).unwrap_or_else(|| s.trim().to_string())
}

/// Date normalizer. Unrecognized input is returned trimmed, unchanged.
pub fn normalize_date(s: &str) -> String {
    normalize_date_in_year(s, Local::now().year())
}

/// Longest leading `-?digits[.digits]` prefix parsed as a float.
fn parse_float_prefix(s: &str) -> Option<f64> {
    let b = s.as_bytes();
    let mut end = 0;
    if b.first() == Some(&b'-') {
        end = 1;
    }
    let start = end;
    while end < b.len() && b[end].is_ascii_digit() {
        end += 1;
    }
    if end < b.len() && b[end] == b'.' {
        end += 1;
        while end < b.len() && b[end].is_ascii_digit() {
            end += 1;
        }
    }
    if !s[start..end].bytes().any(|c| c.is_ascii_digit()) {
        return None;
    }
    s[..end].parse::<f64>().ok()
}

/// Parses an amount written with either Indonesian (`1.000.000,50`) or US
/// (`1,000,000.50`) separators. Returns `None` when no digits survive.
///
/// The decimal separator is only inferred when both separators are present;
/// a lone kind is always a thousands separator, so `500.000` is 500000.
/// The magnitude is rounded half away from zero.
pub fn parse_amount_checked(s: &str) -> Option<u64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let numeric = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(period)) if comma > period => cleaned
            .char_indices()
            .filter_map(|(i, ch)| match ch {
                ',' if i == comma => Some('.'),
                ',' | '.' => None,
                _ => Some(ch),
            })
            .collect::<String>(),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        _ => cleaned.replace(['.', ','], ""),
    };

    let value = parse_float_prefix(&numeric)?;
    if !value.is_finite() {
        return None;
    }
    Some(value.abs().round() as u64)
}

/// Amount normalizer. Anything unparseable is zero.
pub fn normalize_amount(s: &str) -> u64 {
    parse_amount_checked(s).unwrap_or(0)
}
