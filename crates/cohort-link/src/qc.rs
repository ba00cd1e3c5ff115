//! Quality-control filter for scan tables.

use polars::prelude::AnyValue;
use tracing::debug;

use cohort_common::any_to_key_text;
use cohort_model::{DropReason, QcRule, ScanState, StageReport};

use crate::columns::filter_rows;
use crate::error::Result;
use crate::frame::{SourceFrame, StageOutput};

/// Keeps rows that pass `rule`, in input order.
///
/// A table without the QC field passes untouched. QC codes are compared in
/// canonical text form, so `2`, `2.0` and `"2"` all match a pass value of
/// `"2"`; a null code fails. Excluded categories are dropped only when the
/// category field exists, and a null category is kept.
pub fn filter_qc(frame: &SourceFrame, rule: &QcRule) -> Result<StageOutput> {
    let stage = format!("qc:{}", frame.name);
    let mut report = StageReport::new(stage, frame.height()).with_state(ScanState::QcPassed);
    let mut keep = vec![true; frame.height()];

    if frame.has_column(&rule.field) {
        let pass = rule.pass_value.trim();
        let column = frame.column(&rule.field)?;
        let mut failed = 0;
        for (idx, flag) in keep.iter_mut().enumerate() {
            let value = any_to_key_text(column.get(idx).unwrap_or(AnyValue::Null));
            if value.as_deref() != Some(pass) {
                *flag = false;
                failed += 1;
            }
        }
        report.record_drop(DropReason::QcFailed, failed);
    } else {
        debug!(table = %frame.name, field = %rule.field, "QC field absent; table not filtered");
    }

    if !rule.excluded_categories.is_empty() && frame.has_column(&rule.category_field) {
        let column = frame.column(&rule.category_field)?;
        let mut excluded = 0;
        for (idx, flag) in keep.iter_mut().enumerate() {
            if !*flag {
                continue;
            }
            let Some(category) = any_to_key_text(column.get(idx).unwrap_or(AnyValue::Null))
            else {
                continue;
            };
            if rule
                .excluded_categories
                .iter()
                .any(|excluded| excluded.trim() == category)
            {
                *flag = false;
                excluded += 1;
            }
        }
        report.record_drop(DropReason::ExcludedCategory, excluded);
    }

    let data = filter_rows(&frame.data, &keep)?;
    debug!(
        table = %frame.name,
        input = frame.height(),
        kept = data.height(),
        "QC filter applied"
    );
    Ok(StageOutput::new(frame.with_data(data), report))
}
