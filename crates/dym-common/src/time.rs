//! Fractional-year date handling for DYM files.
//!
//! DYM files store dates as `f32` values whose integer part is the year and
//! whose fraction encodes the day of the year. Two day counts are in use:
//!
//! - **leap-aware**: fraction × 366 on leap years (365 otherwise), rounded
//!   half-to-even. Used for per-level display strings.
//! - **fixed 365**: fraction × 365, truncated. Used for the header's first
//!   and last dates and for generating monthly time axes.
//!
//! Both resolve to `Jan 1 + (day - 1)`, so an exact integer year lands on
//! December 31 of the previous year. Downstream files rely on that offset;
//! do not correct it here.
//!
//! The fraction and the day count are computed in `f32`, the width the
//! values are stored with. Widening first moves days that sit on a rounding
//! boundary.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DateError;

/// Returned by [`date_dym2_to_str`] when a value has no calendar date.
pub const DATE_PLACEHOLDER: &str = "xxxxxxxx";

/// Step (in days) that selects the monthly generator.
pub const MONTHLY_DELTA_DAYS: u32 = 30;

const MIN_YEAR: i64 = 1;
const MAX_YEAR: i64 = 9999;

/// Time coordinate of a decoded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum TimeAxis {
    /// Fractional-year values exactly as stored, in file order.
    Raw(Vec<f32>),
    /// Calendar dates (daily granularity).
    Dates(Vec<NaiveDate>),
}

impl TimeAxis {
    pub fn len(&self) -> usize {
        match self {
            TimeAxis::Raw(values) => values.len(),
            TimeAxis::Dates(dates) => dates.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dates(&self) -> bool {
        matches!(self, TimeAxis::Dates(_))
    }
}

/// How the time coordinate is built from a DYM header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeAxisMode {
    /// Keep the stored fractional-year values.
    Raw,
    /// Generate dates from the header's first/last dates (fixed-365 codec).
    /// A step of 30 days selects one date per month, any other step
    /// produces `first + i * delta_days`.
    HeaderRange { delta_days: u32 },
    /// Convert every stored level value with the leap-aware codec.
    PerLevel,
}

impl Default for TimeAxisMode {
    fn default() -> Self {
        TimeAxisMode::HeaderRange {
            delta_days: MONTHLY_DELTA_DAYS,
        }
    }
}

/// Parse a textual fractional-year value.
pub fn parse_dym_date(text: &str) -> Result<f64, DateError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| DateError::NotANumber(text.to_string()))
}

/// Leap-aware conversion of a fractional-year value.
pub fn leap_aware_date(value: f64) -> Result<NaiveDate, DateError> {
    let (year, fraction) = split_year(value)?;
    let days_in_year: f32 = if is_leap_year(year) { 366.0 } else { 365.0 };
    let days = (fraction * days_in_year).round_ties_even() as i64;
    offset_from_new_year(value, year, days)
}

/// Fixed-365 conversion of a fractional-year value.
pub fn fixed365_date(value: f64) -> Result<NaiveDate, DateError> {
    let (year, fraction) = split_year(value)?;
    let days = (fraction * 365.0_f32).trunc() as i64;
    offset_from_new_year(value, year, days)
}

/// Year and month of a fixed-365 value.
///
/// The year is the truncated input, not the year of the resolved date:
/// `2022.0` yields `(2022, 12)`.
pub fn year_month_fixed365(value: f64) -> Result<(i32, u32), DateError> {
    let (year, _) = split_year(value)?;
    Ok((year, fixed365_date(value)?.month()))
}

/// Format a value as `YYYYMMDD` with the leap-aware codec.
///
/// Values without a calendar date are logged and replaced by
/// [`DATE_PLACEHOLDER`].
pub fn date_dym2_to_str(value: f64) -> String {
    match leap_aware_date(value) {
        Ok(date) => date.format("%Y%m%d").to_string(),
        Err(e) => {
            warn!(value, error = %e, "Could not convert DYM date");
            DATE_PLACEHOLDER.to_string()
        }
    }
}

/// One date per month: the 15th of every `(year, month)` in
/// `start.0..=end.0` × `start.1..=end.1`, year-major.
///
/// This is a Cartesian product, not a calendar walk. A range such as
/// `(2000, 11)..(2001, 2)` produces no dates at all.
pub fn gen_monthly_dates(start: (i32, u32), end: (i32, u32)) -> Result<Vec<NaiveDate>, DateError> {
    let mut dates = Vec::new();
    for year in start.0..=end.0 {
        for month in start.1..=end.1 {
            let date = NaiveDate::from_ymd_opt(year, month, 15)
                .ok_or(DateError::InvalidMonth { year, month })?;
            dates.push(date);
        }
    }
    Ok(dates)
}

/// `count` dates spaced `delta_days` apart, starting at `start`.
pub fn gen_daily_dates(
    start: NaiveDate,
    count: usize,
    delta_days: i64,
) -> Result<Vec<NaiveDate>, DateError> {
    (0..count as i64)
        .map(|i| {
            let days = i * delta_days;
            start
                .checked_add_signed(Duration::days(days))
                .ok_or(DateError::DayOutOfRange {
                    value: f64::from(start.year()),
                    days,
                })
        })
        .collect()
}

/// Dates described by a header's first/last date pair.
pub fn header_range_dates(
    first_date: f64,
    last_date: f64,
    nlevel: usize,
    delta_days: u32,
) -> Result<Vec<NaiveDate>, DateError> {
    if delta_days == MONTHLY_DELTA_DAYS {
        gen_monthly_dates(year_month_fixed365(first_date)?, year_month_fixed365(last_date)?)
    } else {
        gen_daily_dates(fixed365_date(first_date)?, nlevel, i64::from(delta_days))
    }
}

fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

fn split_year(value: f64) -> Result<(i32, f32), DateError> {
    let stored = value as f32;
    if !stored.is_finite() {
        return Err(DateError::YearOutOfRange { value, year: 0 });
    }
    let year = stored.trunc();
    if year < MIN_YEAR as f32 || year > MAX_YEAR as f32 {
        return Err(DateError::YearOutOfRange {
            value,
            year: year as i64,
        });
    }
    Ok((year as i32, stored - year))
}

fn offset_from_new_year(value: f64, year: i32, days: i64) -> Result<NaiveDate, DateError> {
    let new_year = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(DateError::YearOutOfRange {
        value,
        year: i64::from(year),
    })?;
    let date = new_year
        .checked_add_signed(Duration::days(days - 1))
        .ok_or(DateError::DayOutOfRange { value, days })?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&i64::from(date.year())) {
        return Err(DateError::DayOutOfRange { value, days });
    }
    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_leap_aware_mid_year() {
        assert_eq!(leap_aware_date(2020.5).unwrap(), ymd(2020, 7, 1));
        // 182.5 rounds half-to-even
        assert_eq!(leap_aware_date(2021.5).unwrap(), ymd(2021, 7, 1));
    }

    #[test]
    fn test_leap_aware_integer_year_is_previous_new_years_eve() {
        assert_eq!(leap_aware_date(2022.0).unwrap(), ymd(2021, 12, 31));
    }

    #[test]
    fn test_date_string_placeholder_for_negative_year() {
        assert_eq!(date_dym2_to_str(-2021.512), DATE_PLACEHOLDER);
        assert_eq!(date_dym2_to_str(f64::NAN), DATE_PLACEHOLDER);
        assert_eq!(date_dym2_to_str(10000.5), DATE_PLACEHOLDER);
    }

    #[test]
    fn test_date_string_format() {
        assert_eq!(date_dym2_to_str(2021.5), "20210701");
        assert_eq!(date_dym2_to_str(2022.003), "20220101");
    }

    #[test]
    fn test_leap_aware_rounds_in_stored_precision() {
        // fraction * 365 is exactly 20.5 in f32 and slightly above in f64
        let value = f64::from(1.056_164_4_f32);
        assert_eq!(leap_aware_date(value).unwrap(), ymd(1, 1, 20));
    }

    #[test]
    fn test_fixed365_integer_year_quirk() {
        assert_eq!(fixed365_date(2022.0).unwrap(), ymd(2021, 12, 31));
        assert_eq!(fixed365_date(1999.0).unwrap(), ymd(1998, 12, 31));
    }

    #[test]
    fn test_fixed365_truncates() {
        assert_eq!(fixed365_date(2022.5).unwrap(), ymd(2022, 7, 1));
    }

    #[test]
    fn test_year_month_keeps_truncated_year() {
        assert_eq!(year_month_fixed365(2022.0).unwrap(), (2022, 12));
        assert_eq!(year_month_fixed365(2000.04).unwrap(), (2000, 1));
    }

    #[test]
    fn test_parse_dym_date_rejects_text() {
        assert_eq!(parse_dym_date(" 2021.5 ").unwrap(), 2021.5);
        assert!(matches!(
            parse_dym_date("invalid"),
            Err(DateError::NotANumber(_))
        ));
    }

    #[test]
    fn test_header_range_monthly() {
        let dates = header_range_dates(2000.04, 2000.96, 12, 30).unwrap();
        assert_eq!(dates.len(), 12);
        assert_eq!(dates[0], ymd(2000, 1, 15));
        assert_eq!(dates[11], ymd(2000, 12, 15));
    }

    #[test]
    fn test_header_range_daily() {
        let dates = header_range_dates(2000.04, 2000.96, 3, 10).unwrap();
        assert_eq!(dates, vec![ymd(2000, 1, 14), ymd(2000, 1, 24), ymd(2000, 2, 3)]);
    }
}
