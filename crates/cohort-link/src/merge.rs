//! Exact key merge between two tables.
//!
//! Unlike [`crate::nearest`], keys must match exactly. Every pairing is kept
//! (many-to-many), left rows stay in input order and, within one left row,
//! right matches follow right input order. A key with a null part matches
//! nothing.

use std::collections::HashMap;

use tracing::debug;

use cohort_model::{DropReason, JoinKind, ScanState, StageReport};

use crate::columns::{JoinSuffixes, attach_columns, composite_keys, non_key_columns, take_rows};
use crate::error::Result;
use crate::frame::{SourceFrame, StageOutput};

#[derive(Debug, Clone)]
pub struct KeyedMerge {
    pub stage: String,
    pub keys: Vec<String>,
    pub kind: JoinKind,
    pub suffixes: JoinSuffixes,
    pub state: Option<ScanState>,
}

impl KeyedMerge {
    pub fn new<S: AsRef<str>>(stage: impl Into<String>, keys: &[S]) -> Self {
        Self {
            stage: stage.into(),
            keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
            kind: JoinKind::Left,
            suffixes: JoinSuffixes::default(),
            state: None,
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn suffixes(mut self, suffixes: JoinSuffixes) -> Self {
        self.suffixes = suffixes;
        self
    }

    #[must_use]
    pub fn state(mut self, state: ScanState) -> Self {
        self.state = Some(state);
        self
    }
}

/// Joins `right` onto `left` where all key fields are equal.
///
/// Key columns appear once, taken from the left side. Other right columns
/// that collide with left names get the merge suffixes.
pub fn merge_on_keys(
    left: &SourceFrame,
    right: &SourceFrame,
    merge: &KeyedMerge,
) -> Result<StageOutput> {
    left.require(&merge.keys)?;
    right.require(&merge.keys)?;

    let mut report = StageReport::new(merge.stage.clone(), left.height());
    if let Some(state) = merge.state {
        report = report.with_state(state);
    }

    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (row, key) in composite_keys(right, &merge.keys)?.into_iter().enumerate() {
        if let Some(key) = key {
            index.entry(key).or_default().push(row);
        }
    }

    let left_keys = composite_keys(left, &merge.keys)?;
    let mut left_rows = Vec::with_capacity(left.height());
    let mut right_rows = Vec::with_capacity(left.height());
    let mut unmatched = 0;
    for (row, key) in left_keys.iter().enumerate() {
        match key.as_ref().and_then(|key| index.get(key)) {
            Some(matches) => {
                for &matched in matches {
                    left_rows.push(Some(row));
                    right_rows.push(Some(matched));
                }
            }
            None if merge.kind == JoinKind::Inner => unmatched += 1,
            None => {
                left_rows.push(Some(row));
                right_rows.push(None);
            }
        }
    }
    report.record_drop(DropReason::NoMatch, unmatched);

    let attached = non_key_columns(right, &merge.keys);
    let left_part = take_rows(&left.data, &left_rows)?;
    let right_part = take_rows(&right.data.select(attached)?, &right_rows)?;
    let data = attach_columns(&left.name, left_part, right_part, &merge.suffixes)?;

    debug!(
        stage = %merge.stage,
        left = left.height(),
        right = right.height(),
        output = data.height(),
        "keyed merge"
    );
    Ok(StageOutput::new(left.with_data(data), report))
}
