//! Excel serial date helpers.
//!
//! Both feed formats store dates as Excel 1900-system serial numbers (days since 1899-12-30,
//! which absorbs the Lotus 1-2-3 leap year bug for every date after 1900-02-28).

use chrono::{Duration, NaiveDate, NaiveDateTime};

fn excel_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)
}

/// Convert a serial value (fractional part = time of day) to a date-time.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let secs = (serial * 86_400.0).round();
    if secs > i64::MAX as f64 {
        return None;
    }
    excel_epoch()?.checked_add_signed(Duration::try_seconds(secs as i64)?)
}

/// Convert a serial value to a calendar date, discarding the time of day.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    serial_to_datetime(serial).map(|dt| dt.date())
}

/// Parse a serial written as text (e.g. `"43208"` or `"43208.5"`) to a calendar date.
pub fn parse_serial_date(text: &str) -> Option<NaiveDate> {
    let serial: f64 = text.trim().parse().ok()?;
    serial_to_date(serial)
}
