//! Multi-layout date normalization.
//!
//! Publisher feeds disagree on date formats, so parsing walks a fixed,
//! ordered layout list and the first match wins. Layouts without a
//! year (the vendor `3:04 p.m. ET January 2` form) get the current
//! UTC year.

use crate::types::{AggregatorError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Literal layout accepted at the CLI/HTTP boundary. The day comes
/// before the month; preserved verbatim for wire compatibility.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%d-%m";

/// Parses a feed-supplied date string against the known layouts.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();

    // RFC1123Z and the explicit-GMT variant are both RFC2822.
    if let Ok(date) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(date.with_timezone(&Utc));
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(date.with_timezone(&Utc));
    }

    // Vendor form "3:04 p.m. ET January 2" carries no year.
    let normalized = trimmed.replace("a.m.", "am").replace("p.m.", "pm");
    let with_year = format!("{} {}", normalized, Utc::now().year());
    if let Ok(naive) = NaiveDateTime::parse_from_str(&with_year, "%I:%M %p ET %B %e %Y") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    // Vendor form "January 2, 2006".
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%B %e, %Y") {
        return Ok(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()));
    }

    Err(AggregatorError::UnparseableDate(trimmed.to_string()))
}

/// Parses the user-supplied `YYYY-DD-MM` boundary format.
pub fn parse_default_format(value: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value.trim(), DEFAULT_DATE_FORMAT)
        .map_err(|_| AggregatorError::UnparseableDate(value.trim().to_string()))?;
    Ok(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()))
}
