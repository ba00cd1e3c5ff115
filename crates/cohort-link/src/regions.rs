//! Region column selection and ordering.
//!
//! The final table lists every non-measurement column first, untouched and in
//! its original order, followed by the cortical region columns in catalog
//! order. A measurement column is one whose name ends in `_SUVR` once a
//! modality tag (`_TAU`, `_AMY`, or none) is stripped.

use std::collections::HashSet;

use tracing::warn;

use cohort_model::{CatalogMismatch, RegionCatalog, fields::SUVR_SUFFIX};

use crate::error::Result;
use crate::frame::SourceFrame;

/// Resolved output layout for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionSelection {
    /// Full output column order.
    pub columns: Vec<String>,
    /// The region part of `columns`.
    pub region_columns: Vec<String>,
    /// Measurement columns left out: subcortical or unknown to the catalog.
    pub dropped_measurements: Vec<String>,
    /// Cortical catalog entries that matched no column.
    pub mismatches: Vec<CatalogMismatch>,
}

/// Whether `column` is a regional measurement under any of `tags`.
fn is_measurement<S: AsRef<str>>(column: &str, tags: &[S]) -> bool {
    tags.iter().any(|tag| {
        column
            .strip_suffix(tag.as_ref())
            .is_some_and(|base| base.ends_with(SUVR_SUFFIX))
    })
}

/// Plans the output layout of a table with `columns`.
///
/// For each cortical catalog entry, every tagged variant present is emitted
/// in tag order. Absent entries are skipped and reported as mismatches.
pub fn plan_region_columns<S, T>(columns: &[S], catalog: &RegionCatalog, tags: &[T]) -> RegionSelection
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    let present: HashSet<&str> = columns.iter().map(AsRef::as_ref).collect();
    let mut selection = RegionSelection::default();

    for column in columns.iter().map(AsRef::as_ref) {
        if !is_measurement(column, tags) {
            selection.columns.push(column.to_string());
        }
    }

    for entry in catalog.cortical() {
        let mut matched = false;
        for tag in tags {
            let candidate = format!("{}{}", entry.output_column, tag.as_ref());
            if present.contains(candidate.as_str()) && !selection.region_columns.contains(&candidate)
            {
                selection.region_columns.push(candidate);
                matched = true;
            }
        }
        if !matched {
            selection.mismatches.push(CatalogMismatch {
                region_label: entry.region_label.clone(),
                output_column: entry.output_column.clone(),
                ordinal_position: entry.ordinal_position,
            });
        }
    }

    let selected: HashSet<&str> = selection.region_columns.iter().map(String::as_str).collect();
    selection.dropped_measurements = columns
        .iter()
        .map(AsRef::as_ref)
        .filter(|column| is_measurement(column, tags) && !selected.contains(column))
        .map(str::to_string)
        .collect();
    selection.columns.extend(selection.region_columns.iter().cloned());
    selection
}

/// Reorders `frame` into its final layout, warning about catalog mismatches.
pub fn select_regions<T: AsRef<str>>(
    frame: &SourceFrame,
    catalog: &RegionCatalog,
    tags: &[T],
) -> Result<(SourceFrame, RegionSelection)> {
    let selection = plan_region_columns(&frame.column_names(), catalog, tags);
    for mismatch in &selection.mismatches {
        warn!(
            region = %mismatch.region_label,
            column = %mismatch.output_column,
            position = mismatch.ordinal_position,
            "catalog region matched no column"
        );
    }
    let data = frame.data.select(selection.columns.iter().map(String::as_str))?;
    Ok((frame.with_data(data), selection))
}
