//! Unit tests for the PM scheduling engine.


use chrono::NaiveDate;

/// Builds a calendar date, panicking on invalid fixtures.
fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}
