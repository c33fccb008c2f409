//! Tests for the fractional-year date codec and generators.

use chrono::NaiveDate;
use dym_common::time::{
    date_dym2_to_str, fixed365_date, gen_daily_dates, gen_monthly_dates, leap_aware_date,
    TimeAxis, TimeAxisMode, DATE_PLACEHOLDER,
};
use dym_common::DateError;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// Leap-aware codec
// ============================================================================

#[test]
fn test_leap_aware_out_of_range_year_is_placeholder() {
    assert_eq!(date_dym2_to_str(-2021.512), "xxxxxxxx");
    assert_eq!(DATE_PLACEHOLDER.len(), 8);
}

#[test]
fn test_leap_aware_out_of_range_reports_year() {
    match leap_aware_date(-2021.512) {
        Err(DateError::YearOutOfRange { year, .. }) => assert_eq!(year, -2021),
        other => panic!("expected YearOutOfRange, got {:?}", other),
    }
}

#[test]
fn test_leap_aware_uses_366_days_on_leap_years() {
    // 0.25 * 366 = 91.5 -> 92 (ties to even)
    assert_eq!(leap_aware_date(2020.25).unwrap(), ymd(2020, 4, 1));
    // 0.25 * 365 = 91.25 -> 91
    assert_eq!(leap_aware_date(2021.25).unwrap(), ymd(2021, 4, 1));
}

// ============================================================================
// Fixed-365 codec
// ============================================================================

#[test]
fn test_fixed365_exact_year_resolves_to_previous_december_31() {
    for year in [1950, 2000, 2022] {
        let date = fixed365_date(f64::from(year)).unwrap();
        assert_eq!(date, ymd(year - 1, 12, 31));
    }
}

#[test]
fn test_fixed365_ignores_leap_years() {
    // day 91 in both years; only the leap day moves the calendar date
    assert_eq!(fixed365_date(2020.25).unwrap(), ymd(2020, 3, 31));
    assert_eq!(fixed365_date(2021.25).unwrap(), ymd(2021, 4, 1));
}

// ============================================================================
// Generators
// ============================================================================

#[test]
fn test_monthly_dates_cartesian_product() {
    let dates = gen_monthly_dates((2000, 1), (2001, 3)).unwrap();
    assert_eq!(
        dates,
        vec![
            ymd(2000, 1, 15),
            ymd(2000, 2, 15),
            ymd(2000, 3, 15),
            ymd(2001, 1, 15),
            ymd(2001, 2, 15),
            ymd(2001, 3, 15),
        ]
    );
}

#[test]
fn test_monthly_dates_wrapping_range_underproduces() {
    let dates = gen_monthly_dates((2000, 11), (2001, 2)).unwrap();
    assert!(dates.is_empty());
}

#[test]
fn test_monthly_dates_invalid_month() {
    assert!(matches!(
        gen_monthly_dates((2000, 12), (2000, 13)),
        Err(DateError::InvalidMonth { month: 13, .. })
    ));
}

#[test]
fn test_daily_dates_step() {
    let dates = gen_daily_dates(ymd(2000, 1, 1), 3, 10).unwrap();
    assert_eq!(dates, vec![ymd(2000, 1, 1), ymd(2000, 1, 11), ymd(2000, 1, 21)]);
    assert!(gen_daily_dates(ymd(2000, 1, 1), 0, 10).unwrap().is_empty());
}

// ============================================================================
// TimeAxis
// ============================================================================

#[test]
fn test_time_axis_len() {
    assert_eq!(TimeAxis::Raw(vec![2000.5, 2000.6]).len(), 2);
    assert!(TimeAxis::Dates(vec![]).is_empty());
    assert!(TimeAxis::Dates(vec![ymd(2000, 1, 1)]).is_dates());
}

#[test]
fn test_time_axis_mode_default_is_monthly() {
    assert_eq!(
        TimeAxisMode::default(),
        TimeAxisMode::HeaderRange { delta_days: 30 }
    );
}
