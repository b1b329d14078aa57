//! Yearly date windows from a year span and a day-of-year range.

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use crate::error::ExtractError;

/// A half-open `[start, end)` date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    /// First day included.
    pub start: NaiveDate,
    /// First day excluded.
    pub end: NaiveDate,
}

impl DateWindow {
    /// Start as Unix milliseconds at UTC midnight.
    #[must_use]
    pub fn start_millis(&self) -> i64 {
        midnight_millis(self.start)
    }

    /// End as Unix milliseconds at UTC midnight.
    #[must_use]
    pub fn end_millis(&self) -> i64 {
        midnight_millis(self.end)
    }
}

fn midnight_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0).map_or(0, |dt| dt.and_utc().timestamp_millis())
}

/// Compute one window per year in `start_year..=end_year`.
///
/// A window starts on day `start_doy` of its year. When `start_doy > end_doy`
/// the window wraps and ends on day `end_doy` of the following year.
///
/// # Errors
///
/// Returns a validation error if a date falls outside the supported calendar.
pub fn yearly_windows(
    start_year: i32,
    end_year: i32,
    start_doy: u32,
    end_doy: u32,
) -> Result<Vec<DateWindow>, ExtractError> {
    let wraps = start_doy > end_doy;
    (start_year..=end_year)
        .map(|year| {
            let end_year = if wraps {
                year.checked_add(1).ok_or_else(|| out_of_range(year))?
            } else {
                year
            };
            Ok(DateWindow { start: day_of_year(year, start_doy)?, end: day_of_year(end_year, end_doy)? })
        })
        .collect()
}

/// Whether a window's start or end ran past December 31st because day 366
/// was requested in a common year.
#[must_use]
pub fn rolled_over(window: &DateWindow, start_doy: u32, end_doy: u32) -> bool {
    window.start.ordinal() != start_doy || window.end.ordinal() != end_doy
}

/// January 1st of `year` advanced by `doy - 1` days.
fn day_of_year(year: i32, doy: u32) -> Result<NaiveDate, ExtractError> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|jan1| jan1.checked_add_days(Days::new(u64::from(doy.saturating_sub(1)))))
        .ok_or_else(|| out_of_range(year))
}

fn out_of_range(year: i32) -> ExtractError {
    ExtractError::Validation(format!("Validation error: year {year} is out of range"))
}

/// Format Unix milliseconds as an ISO date (`YYYY-MM-DD`, UTC).
///
/// # Errors
///
/// Returns an error if the timestamp is outside the representable range.
pub fn format_millis(millis: i64) -> Result<String, ExtractError> {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
        .ok_or_else(|| ExtractError::UnexpectedResponse(format!("Image timestamp {millis} is out of range")))
}
