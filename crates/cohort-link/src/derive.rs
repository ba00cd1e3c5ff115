//! Column derivations: date coalescing, age at scan and scan gaps.

use polars::prelude::{
    AnyValue, Float64Chunked, Int64Chunked, IntoColumn, IntoSeries, NewChunkedArray,
};
use tracing::warn;

use cohort_common::{any_to_f64, days_between};

use crate::columns::day_numbers;
use crate::error::Result;
use crate::frame::SourceFrame;

const DAYS_PER_YEAR: f64 = 365.25;

/// Folds `<field><primary_suffix>` and `<field><fallback_suffix>` into `field`.
///
/// The primary value wins where present. Both source columns are dropped.
/// When the merge did not split `field` in two, the frame is returned as is.
pub fn coalesce_suffixed(
    frame: &SourceFrame,
    field: &str,
    primary_suffix: &str,
    fallback_suffix: &str,
) -> Result<SourceFrame> {
    let primary_name = format!("{field}{primary_suffix}");
    let fallback_name = format!("{field}{fallback_suffix}");
    if !(frame.has_column(&primary_name) && frame.has_column(&fallback_name)) {
        return Ok(frame.clone());
    }
    let primary = frame.column(&primary_name)?.as_materialized_series();
    let fallback = frame.column(&fallback_name)?.as_materialized_series();
    let fallback = if fallback.dtype() == primary.dtype() {
        fallback.clone()
    } else {
        fallback.cast(primary.dtype())?
    };
    let mut merged = primary.zip_with(&primary.is_not_null(), &fallback)?;
    merged.rename(field.into());

    let mut data = frame.data.drop(&primary_name)?.drop(&fallback_name)?;
    data.with_column(merged)?;
    Ok(frame.with_data(data))
}

/// Renames one column; the frame must contain it.
pub fn rename_column(frame: &SourceFrame, from: &str, to: &str) -> Result<SourceFrame> {
    frame.column(from)?;
    let mut data = frame.data.clone();
    data.rename(from, to.into())?;
    Ok(frame.with_data(data))
}

/// `AGE_AT_SCAN = AGE + (scan date - baseline exam date) / 365.25 years`.
///
/// Null wherever an input is null. When an input column is absent the
/// derivation is skipped with a warning.
pub fn age_at_scan(
    frame: &SourceFrame,
    age_field: &str,
    scan_field: &str,
    baseline_field: &str,
    target: &str,
) -> Result<SourceFrame> {
    let missing: Vec<&str> = [age_field, scan_field, baseline_field]
        .into_iter()
        .filter(|field| !frame.has_column(field))
        .collect();
    if !missing.is_empty() {
        warn!(table = %frame.name, missing = ?missing, "{target} not derived; input columns absent");
        return Ok(frame.clone());
    }

    let age = frame.column(age_field)?;
    let scan_days = day_numbers(frame, scan_field)?;
    let baseline_days = day_numbers(frame, baseline_field)?;
    let values = (0..frame.height()).map(|idx| {
        let age = any_to_f64(age.get(idx).unwrap_or(AnyValue::Null))?;
        let offset = days_between(baseline_days[idx], scan_days[idx])?;
        Some(age + offset as f64 / DAYS_PER_YEAR)
    });
    let derived = Float64Chunked::from_iter_options(target.into(), values).into_series();

    let mut data = frame.data.clone();
    data.with_column(derived)?;
    Ok(frame.with_data(data))
}

/// `target = later - earlier` in whole days, null when either date is null.
pub fn scan_gap_days(
    frame: &SourceFrame,
    earlier_field: &str,
    later_field: &str,
    target: &str,
) -> Result<SourceFrame> {
    let earlier = day_numbers(frame, earlier_field)?;
    let later = day_numbers(frame, later_field)?;
    let gaps = earlier
        .iter()
        .zip(&later)
        .map(|(earlier, later)| days_between(*earlier, *later));
    let derived = Int64Chunked::from_iter_options(target.into(), gaps).into_column();

    let mut data = frame.data.clone();
    data.with_column(derived)?;
    Ok(frame.with_data(data))
}
