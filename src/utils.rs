/// Utility functions for log formatting
use time::{format_description, OffsetDateTime};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    match format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]") {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Month, PrimitiveDateTime, Time};

    #[test]
    fn formats_day_first() {
        let date = Date::from_calendar_date(2024, Month::March, 9).unwrap();
        let time = Time::from_hms(7, 5, 59).unwrap();
        let dt = PrimitiveDateTime::new(date, time).assume_utc();
        assert_eq!(format_datetime(&dt), "09.03.2024 - 07:05:59");
    }
}
