//! Cell-level parsers used by type coercion.
//!
//! Every parser takes the 0-based data row so failures can name the CSV line.

use crate::error::{CleaningError, Result};
use crate::utils::csv_line;
use chrono::{Datelike, NaiveDate};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Polars `Date` physical value (days since the Unix epoch).
pub(crate) fn date_to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Parse a date cell. Missing and malformed dates are both fatal.
pub(crate) fn parse_date(value: Option<&str>, format: &str, row: usize) -> Result<NaiveDate> {
    let raw = value.map(str::trim).unwrap_or_default();
    NaiveDate::parse_from_str(raw, format).map_err(|_| CleaningError::DateParse {
        line: csv_line(row),
        value: raw.to_string(),
        format: format.to_string(),
    })
}

/// Parse a required non-negative whole number. `"2.0"` is accepted as 2.
pub(crate) fn parse_count(column: &str, value: Option<&str>, row: usize) -> Result<i64> {
    let raw = value.map(str::trim).unwrap_or_default();
    let fail = |reason: &str| CleaningError::TypeConversionFailed {
        column: column.to_string(),
        line: csv_line(row),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    if raw.is_empty() {
        return Err(fail("value is required"));
    }

    let parsed = match raw.parse::<i64>() {
        Ok(n) => n,
        Err(_) => {
            let float_val: f64 = raw.parse().map_err(|_| fail("not a number"))?;
            if !float_val.is_finite() || float_val.fract() != 0.0 {
                return Err(fail("not a whole number"));
            }
            if float_val >= i64::MAX as f64 {
                return Err(fail("out of range"));
            }
            float_val as i64
        }
    };

    if parsed < 0 {
        return Err(fail("must not be negative"));
    }
    Ok(parsed)
}

/// Parse an optional decimal amount. Empty and `nan` cells stay null.
pub(crate) fn parse_amount(column: &str, value: Option<&str>, row: usize) -> Result<Option<f64>> {
    let raw = match value.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    let parsed: f64 = raw.parse().map_err(|_| CleaningError::TypeConversionFailed {
        column: column.to_string(),
        line: csv_line(row),
        value: raw.to_string(),
        reason: "not a number".to_string(),
    })?;

    Ok(if parsed.is_nan() { None } else { Some(parsed) })
}
