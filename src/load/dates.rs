//! Lenient calendar-date parsing for the birth_date column
//!
//! Values are tried against a fixed list of layouts, ISO first and
//! month-first before day-first. A value matching none of them parses as
//! `None`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Layouts with a four-digit year
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
];

/// Layouts with a two-digit year
const SHORT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%d/%m/%y", "%d.%m.%y"];

/// Years the destination's DATE column accepts as written
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1000..=9999;

fn in_range(date: &NaiveDate) -> bool {
    YEAR_RANGE.contains(&date.year())
}

/// Parse a date, returning `None` for anything unrecognised
///
/// Dates outside years 1000 to 9999 count as unrecognised.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    parse_compact(s)
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .filter(in_range)
        .or_else(|| {
            // %Y also accepts one to three digits, which would turn "03/12/90" into year 90
            DATE_FORMATS
                .iter()
                .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .find(in_range)
        })
        .or_else(|| {
            SHORT_YEAR_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
        .filter(in_range)
}

/// `YYYYMMDD`
fn parse_compact(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = s[0..4].parse().ok()?;
    let month: u32 = s[4..6].parse().ok()?;
    let day: u32 = s[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
