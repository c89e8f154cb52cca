//! # Month resolution
//!
//! Every record carries a `month` tag (`"1"` … `"12"`) that is derived from its
//! `date`, never typed by the user. [`resolve_month_for_mutation`] is the only
//! function the cache uses to compute that tag, for creates and updates alike.
//!
//! Dates are calendar dates in `YYYY-MM-DD` form. RFC 3339 timestamps are also
//! accepted; only their date part (in the timestamp's own offset) is used, so a
//! record never shifts month because of the reader's time zone.

use chrono::{DateTime, Datelike, NaiveDate};

use crate::error::{LedgerError, LedgerResult};

/// `(tag, label)` for each month, January first.
pub const MONTHS: [(&str, &str); 12] = [
    ("1", "January"),
    ("2", "February"),
    ("3", "March"),
    ("4", "April"),
    ("5", "May"),
    ("6", "June"),
    ("7", "July"),
    ("8", "August"),
    ("9", "September"),
    ("10", "October"),
    ("11", "November"),
    ("12", "December"),
];

/// Parse a calendar date, returning `None` when the text is not a date.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|d| d.date_naive()))
}

/// The 1-based month of `date_text` as a string tag.
pub fn canonical_month(date_text: &str) -> LedgerResult<String> {
    parse_date(date_text)
        .map(|d| d.month().to_string())
        .ok_or_else(|| LedgerError::UnparseableDate(date_text.to_string()))
}

/// Month tag for a record about to be written.
///
/// A blank date keeps `fallback_month` untouched; anything else must parse.
pub fn resolve_month_for_mutation(date_text: &str, fallback_month: &str) -> LedgerResult<String> {
    if date_text.trim().is_empty() {
        return Ok(fallback_month.to_string());
    }
    canonical_month(date_text)
}

/// Calendar year of `date_text`, if it parses.
pub fn year_of(date_text: &str) -> Option<i32> {
    parse_date(date_text).map(|d| d.year())
}

/// Numeric value of a month tag, if it names one of the twelve months.
pub fn month_number(tag: &str) -> Option<u32> {
    tag.trim().parse::<u32>().ok().filter(|m| (1..=12).contains(m))
}

/// Human-readable name for a month tag. Unknown tags render as `Month <tag>`.
pub fn month_label(tag: &str) -> String {
    MONTHS
        .iter()
        .find(|(value, _)| *value == tag)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| format!("Month {tag}"))
}

/// Three-letter name for a 1-based month number, used by the annual grid.
pub fn month_short_label(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "?",
    }
}
