//! Common types and utilities shared across the DYM crates.

pub mod diagnostics;
pub mod error;
pub mod grid;
pub mod time;

pub use diagnostics::{Diagnostics, Warning, WarningKind};
pub use error::DateError;
pub use grid::{find_resolution, normalize_longitude};
pub use time::{
    date_dym2_to_str, fixed365_date, gen_daily_dates, gen_monthly_dates, header_range_dates,
    leap_aware_date, parse_dym_date, year_month_fixed365, TimeAxis, TimeAxisMode,
    DATE_PLACEHOLDER, MONTHLY_DELTA_DAYS,
};
