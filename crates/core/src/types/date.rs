//! Publication date parsing.
//!
//! Publication dates arrive in several precisions: Google Books reports
//! `"2004"`, `"2004-05"` or `"2004-05-12"`, the mobile client sends
//! `yyyy-MM-dd`, and the web client serializes a JavaScript `Date` as RFC 3339.
//! They are all stored as a calendar date, filling missing parts with the
//! first month/day.

use chrono::{DateTime, NaiveDate};

/// Error returned when a publication date cannot be understood.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized publication date: {0}")]
pub struct DateError(pub String);

/// Parse a publication date leniently.
///
/// ```
/// use bookly_core::parse_published_date;
/// use chrono::NaiveDate;
///
/// let expected = NaiveDate::from_ymd_opt(2004, 5, 1).unwrap();
/// assert_eq!(parse_published_date("2004-05").unwrap(), expected);
/// ```
///
/// # Errors
///
/// Returns `DateError` when the input matches none of the accepted forms.
pub fn parse_published_date(input: &str) -> Result<NaiveDate, DateError> {
    let s = input.trim();
    let err = || DateError(input.to_string());

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    let mut parts = s.splitn(2, '-');
    let year: i32 = parts
        .next()
        .filter(|y| y.len() == 4)
        .and_then(|y| y.parse().ok())
        .ok_or_else(err)?;
    let month: u32 = match parts.next() {
        Some(m) => m.parse().map_err(|_| err())?,
        None => 1,
    };

    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(err)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_date() {
        assert_eq!(parse_published_date("2004-05-12").unwrap(), ymd(2004, 5, 12));
    }

    #[test]
    fn test_year_only() {
        assert_eq!(parse_published_date("1999").unwrap(), ymd(1999, 1, 1));
    }

    #[test]
    fn test_year_month() {
        assert_eq!(parse_published_date(" 2010-11 ").unwrap(), ymd(2010, 11, 1));
    }

    #[test]
    fn test_rfc3339_from_web_client() {
        assert_eq!(
            parse_published_date("2021-03-04T00:00:00.000Z").unwrap(),
            ymd(2021, 3, 4)
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_published_date("").is_err());
        assert!(parse_published_date("May 2004").is_err());
        assert!(parse_published_date("2004-13").is_err());
        assert!(parse_published_date("04").is_err());
    }
}
