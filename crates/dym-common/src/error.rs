//! Error types for the date codec.

use thiserror::Error;

/// Errors raised while turning a fractional-year value into a calendar date.
///
/// These are soft errors: decoders record them and keep going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DateError {
    #[error("expected a fractional-year number, got '{0}'")]
    NotANumber(String),

    #[error("year {year} (from {value}) is outside 1..=9999")]
    YearOutOfRange { value: f64, year: i64 },

    #[error("{value} resolves to day offset {days} which leaves the supported calendar range")]
    DayOutOfRange { value: f64, days: i64 },

    #[error("invalid month {month} for year {year}")]
    InvalidMonth { year: i32, month: u32 },
}
