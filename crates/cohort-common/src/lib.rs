//! Shared utilities for the cohort linkage crates.
//!
//! This crate keeps the small pieces every other crate needs: turning polars
//! `AnyValue`s into comparable text or numbers, and converting between
//! calendar dates and the day numbers stored in polars `Date` columns.

pub mod any_value;
pub mod calendar;

pub use calendar::{date_series, date_to_days, days_between, days_to_date};
pub use any_value::{
    any_to_f64, any_to_i64, any_to_key_text, any_to_string, format_numeric, parse_f64,
    parse_integral,
};
