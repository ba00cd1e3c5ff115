//! Row gates applied after the joins.

use polars::prelude::AnyValue;
use tracing::debug;

use cohort_common::any_to_i64;
use cohort_model::{DropReason, ScanState, StageReport};

use crate::columns::{any_null, filter_rows};
use crate::error::Result;
use crate::frame::{SourceFrame, StageOutput};

/// Drops rows with a null in any of `fields`, counting them under `reason`.
///
/// Every field must exist; a missing column is a schema error, not a pass.
pub fn drop_incomplete<S: AsRef<str>>(
    frame: &SourceFrame,
    fields: &[S],
    reason: DropReason,
    stage: &str,
) -> Result<StageOutput> {
    frame.require(fields)?;
    let mut report = StageReport::new(stage, frame.height());
    let nulls = any_null(frame, fields)?;
    let keep: Vec<bool> = nulls.iter().map(|null| !null).collect();
    report.record_drop(reason, nulls.iter().filter(|null| **null).count());
    let data = filter_rows(&frame.data, &keep)?;
    debug!(stage, input = frame.height(), kept = data.height(), "incomplete rows dropped");
    Ok(StageOutput::new(frame.with_data(data), report))
}

/// Keeps rows whose `|gap|` is strictly below `max_days`.
///
/// A null gap means no partner scan was found and is rejected as
/// `NoCrossModalityMatch`; an out-of-range gap is a `ToleranceRejection`.
pub fn tolerance_gate(frame: &SourceFrame, gap_field: &str, max_days: i64) -> Result<StageOutput> {
    let column = frame.column(gap_field)?;
    let mut report = StageReport::new("tolerance", frame.height()).with_state(ScanState::Accepted);
    let mut keep = Vec::with_capacity(frame.height());
    let mut no_partner = 0;
    let mut rejected = 0;
    for idx in 0..frame.height() {
        match any_to_i64(column.get(idx).unwrap_or(AnyValue::Null)) {
            None => {
                no_partner += 1;
                keep.push(false);
            }
            Some(gap) if gap.abs() >= max_days => {
                rejected += 1;
                keep.push(false);
            }
            Some(_) => keep.push(true),
        }
    }
    report.record_drop(DropReason::NoCrossModalityMatch, no_partner);
    report.record_drop(DropReason::ToleranceRejection, rejected);
    let data = filter_rows(&frame.data, &keep)?;
    debug!(
        max_days,
        accepted = data.height(),
        rejected_by_gap = rejected,
        without_partner = no_partner,
        "tolerance gate"
    );
    Ok(StageOutput::new(frame.with_data(data), report))
}
