//! Day-number arithmetic for polars `Date` columns.
//!
//! Polars stores dates as `i32` days since 1970-01-01. These helpers keep the
//! conversion in one place so the matcher and the derivations agree on it.

use chrono::NaiveDate;
use polars::prelude::{DataType, Int32Chunked, IntoSeries, NewChunkedArray, PolarsResult, Series};

/// Converts a calendar date to days since the Unix epoch.
pub fn date_to_days(date: NaiveDate) -> i32 {
    date.to_epoch_days()
}

/// Converts days since the Unix epoch back to a calendar date.
pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_epoch_days(days)
}

/// Signed day difference `later - earlier`, `None` when either side is missing.
pub fn days_between(earlier: Option<i32>, later: Option<i32>) -> Option<i64> {
    Some(i64::from(later?) - i64::from(earlier?))
}

/// Builds a polars `Date` series from calendar dates.
pub fn date_series<I>(name: &str, dates: I) -> PolarsResult<Series>
where
    I: IntoIterator<Item = Option<NaiveDate>>,
{
    Int32Chunked::from_iter_options(name.into(), dates.into_iter().map(|d| d.map(date_to_days)))
        .into_series()
        .cast(&DataType::Date)
}
