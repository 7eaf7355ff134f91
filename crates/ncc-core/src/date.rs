//! Strict `YYYY-MM-DD` calendar helpers.
//!
//! Dates are assembled from their literal year, month and day components. A
//! form value never passes through a general date-time parser, so there is no
//! time zone around to shift it by a day.

use chrono::{DateTime, Datelike, Days, Local, NaiveDate};

/// `chrono` format string matching the strict wire shape.
pub const STRICT_FORMAT: &str = "%Y-%m-%d";

/// Whether `s` has exactly the `YYYY-MM-DD` shape (digits and two dashes).
fn has_strict_shape(s: &str) -> bool {
  let b = s.as_bytes();
  b.len() == 10
    && b[4] == b'-'
    && b[7] == b'-'
    && b
      .iter()
      .enumerate()
      .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit())
}

/// Parse a strict `YYYY-MM-DD` string into a calendar date.
///
/// Returns `None` when the string does not match the pattern or names a day
/// that does not exist (e.g. `2024-04-31`).
pub fn parse_strict_date(s: &str) -> Option<NaiveDate> {
  let s = s.trim();
  if !has_strict_shape(s) {
    return None;
  }
  let year = s[0..4].parse().ok()?;
  let month = s[5..7].parse().ok()?;
  let day = s[8..10].parse().ok()?;
  NaiveDate::from_ymd_opt(year, month, day)
}

/// Whole months between two strict dates.
///
/// Computed as `years * 12 + months`, minus one when the end's day-of-month is
/// earlier than the start's, so a partial final month is not counted. An end
/// before the start yields a negative count; `None` means an input did not
/// parse.
pub fn months_between(start: &str, end: &str) -> Option<i32> {
  let a = parse_strict_date(start)?;
  let b = parse_strict_date(end)?;
  let mut total =
    (b.year() - a.year()) * 12 + (b.month() as i32 - a.month() as i32);
  if b.day() < a.day() {
    total -= 1;
  }
  Some(total)
}

/// Add `n` calendar months to a strict date.
///
/// The day of month rolls over into the following month when the target
/// month is too short: `2024-01-31` plus one month is `2024-03-02`. Returns an
/// empty string for invalid input.
pub fn add_months(start: &str, n: i32) -> String {
  let Some(date) = parse_strict_date(start) else {
    return String::new();
  };
  let index = date.year() * 12 + date.month0() as i32 + n;
  let (year, month0) = (index.div_euclid(12), index.rem_euclid(12) as u32);

  NaiveDate::from_ymd_opt(year, month0 + 1, 1)
    .and_then(|first| first.checked_add_days(Days::new(u64::from(date.day() - 1))))
    .map(|d| d.format(STRICT_FORMAT).to_string())
    .unwrap_or_default()
}

/// Render a date for tables as `DD-MM-YYYY`.
///
/// Strict values are reordered as plain text. Timestamps that lead with a
/// strict date keep that calendar day as written; other RFC 2822 / RFC 3339
/// timestamps are converted to the local calendar day. Anything else,
/// including the empty string, renders as `-`.
pub fn format_display_date(value: &str) -> String {
  let value = value.trim();
  if value.is_empty() {
    return "-".into();
  }
  if has_strict_shape(value) {
    return format!("{}-{}-{}", &value[8..10], &value[5..7], &value[0..4]);
  }
  timestamp_date(value)
    .map(|d| d.format("%d-%m-%Y").to_string())
    .unwrap_or_else(|| "-".into())
}

fn timestamp_date(value: &str) -> Option<NaiveDate> {
  if let Some(prefix) = value.get(..10)
    && matches!(value.as_bytes().get(10), Some(b'T' | b' '))
  {
    return parse_strict_date(prefix);
  }
  DateTime::parse_from_rfc3339(value)
    .or_else(|_| DateTime::parse_from_rfc2822(value))
    .ok()
    .map(|dt| dt.with_timezone(&Local).date_naive())
}
