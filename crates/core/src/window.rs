//! Time window for the candidate query.

use crate::error::{Error, Result};
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Inclusive `updated_at` range searched for truncated uploads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl DateWindow {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse both ends with [`parse_date`].
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Ledger file name derived from the window, used when no path is given.
    pub fn default_ledger_path(&self) -> PathBuf {
        let fmt = format_description!("[year]-[month]-[day]");
        // Formatting a calendar date with a static description cannot fail.
        let start = self.start.date().format(fmt).unwrap_or_default();
        let end = self.end.date().format(fmt).unwrap_or_default();
        PathBuf::from(format!("backfill-{start}-{end}.db"))
    }
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(input: &str) -> Result<OffsetDateTime> {
    let input = input.trim();
    if let Ok(ts) = OffsetDateTime::parse(input, &Rfc3339) {
        return Ok(ts);
    }
    Date::parse(input, format_description!("[year]-[month]-[day]"))
        .map(|date| date.midnight().assume_utc())
        .map_err(|_| Error::InvalidDate {
            input: input.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_parse_bare_date() {
        assert_eq!(
            parse_date("2022-03-17").unwrap(),
            datetime!(2022-03-17 00:00 UTC)
        );
    }

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(
            parse_date("2022-06-05T12:30:00+02:00").unwrap(),
            datetime!(2022-06-05 10:30 UTC)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_date("last tuesday"),
            Err(Error::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_window_rejects_inverted_range() {
        assert!(matches!(
            DateWindow::parse("2022-06-05", "2022-03-17"),
            Err(Error::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_default_ledger_path() {
        let window = DateWindow::parse("2022-03-17", "2022-06-05T08:00:00Z").unwrap();
        assert_eq!(
            window.default_ledger_path(),
            PathBuf::from("backfill-2022-03-17-2022-06-05.db")
        );
    }
}
