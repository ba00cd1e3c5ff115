//! Collapse repeated keys to one row.

use std::collections::HashMap;

use tracing::debug;

use cohort_model::{DropReason, KeepPolicy, StageReport};

use crate::columns::{composite_keys, filter_rows};
use crate::error::Result;
use crate::frame::{SourceFrame, StageOutput};

/// Keeps exactly one row per distinct key, chosen by input position.
///
/// Rows with a null key part are dropped. Survivors keep their input order.
pub fn dedupe<S: AsRef<str>>(
    frame: &SourceFrame,
    keys: &[S],
    policy: KeepPolicy,
    stage: &str,
) -> Result<StageOutput> {
    let mut report = StageReport::new(stage, frame.height());
    let row_keys = composite_keys(frame, keys)?;

    let mut chosen: HashMap<&str, usize> = HashMap::new();
    let mut missing = 0;
    for (row, key) in row_keys.iter().enumerate() {
        let Some(key) = key else {
            missing += 1;
            continue;
        };
        match policy {
            KeepPolicy::First => {
                chosen.entry(key.as_str()).or_insert(row);
            }
            KeepPolicy::Last => {
                chosen.insert(key.as_str(), row);
            }
        }
    }

    let mut keep = vec![false; frame.height()];
    for &row in chosen.values() {
        keep[row] = true;
    }
    report.record_drop(DropReason::MissingSubjectKey, missing);
    report.record_drop(
        DropReason::Duplicate,
        frame.height() - missing - chosen.len(),
    );

    let data = filter_rows(&frame.data, &keep)?;
    debug!(table = %frame.name, input = frame.height(), kept = data.height(), "deduplicated");
    Ok(StageOutput::new(frame.with_data(data), report))
}
