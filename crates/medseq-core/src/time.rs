//! Timestamp helpers for counter bookkeeping.
//!
//! All counter timestamps are stored and compared in UTC.

use time::{Date, Month, OffsetDateTime, UtcOffset};

use crate::error::Result;

/// Current instant in UTC.
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Midnight UTC of January 1st of the year containing `at`.
pub fn start_of_year(at: OffsetDateTime) -> Result<OffsetDateTime> {
    let at = at.to_offset(UtcOffset::UTC);
    let date = Date::from_calendar_date(at.year(), Month::January, 1)?;
    Ok(date.midnight().assume_utc())
}

/// Midnight UTC of the first day of the month containing `at`.
pub fn start_of_month(at: OffsetDateTime) -> Result<OffsetDateTime> {
    let at = at.to_offset(UtcOffset::UTC);
    let date = Date::from_calendar_date(at.year(), at.month(), 1)?;
    Ok(date.midnight().assume_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_start_of_year() {
        let at = datetime!(2024-07-19 13:45:10 UTC);
        assert_eq!(start_of_year(at).unwrap(), datetime!(2024-01-01 00:00:00 UTC));
    }

    #[test]
    fn test_start_of_month() {
        let at = datetime!(2024-02-29 23:59:59 UTC);
        assert_eq!(start_of_month(at).unwrap(), datetime!(2024-02-01 00:00:00 UTC));
    }

    #[test]
    fn test_boundaries_use_utc() {
        // 01:30 on Jan 1st in +05:30 is still Dec 31st in UTC
        let at = datetime!(2025-01-01 01:30:00 +05:30);
        assert_eq!(start_of_year(at).unwrap(), datetime!(2024-01-01 00:00:00 UTC));
        assert_eq!(start_of_month(at).unwrap(), datetime!(2024-12-01 00:00:00 UTC));
    }

    #[test]
    fn test_now_utc_is_utc() {
        assert_eq!(now_utc().offset(), UtcOffset::UTC);
    }
}
