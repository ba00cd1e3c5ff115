//! Grouped nearest-in-time matching.
//!
//! For every left row, pick the single right row of the same subject whose
//! date is closest. Subjects partition both sides; within a partition right
//! rows are sorted by `(day, input position)` and searched with
//! `partition_point`.
//!
//! Tie rules:
//! - equal distance either side resolves to the earlier right record;
//! - a backward or exact match on a day shared by several right records takes
//!   the last of them in input order, a forward match takes the first.
//!
//! Output rows are ordered by `(subject key, left day, left input position)`,
//! so the result does not depend on how either input was sorted.

use std::collections::HashMap;

use tracing::debug;

use cohort_model::{DropReason, JoinKind, MatchDirection, ScanState, StageReport, fields};

use crate::columns::{
    JoinSuffixes, attach_columns, day_numbers, non_key_columns, subject_keys, take_rows,
};
use crate::error::Result;
use crate::frame::{SourceFrame, StageOutput};

/// Parameters of one nearest-in-time join.
#[derive(Debug, Clone)]
pub struct NearestJoin {
    pub stage: String,
    pub subject_key: String,
    pub left_time: String,
    pub right_time: String,
    /// Right columns to attach. `None` attaches every non-key column.
    pub keep_right: Option<Vec<String>>,
    pub direction: MatchDirection,
    pub kind: JoinKind,
    pub suffixes: JoinSuffixes,
    pub state: Option<ScanState>,
}

impl NearestJoin {
    /// An outer nearest join on `RID`, attaching every right column.
    pub fn new(
        stage: impl Into<String>,
        left_time: impl Into<String>,
        right_time: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            subject_key: fields::RID.to_string(),
            left_time: left_time.into(),
            right_time: right_time.into(),
            keep_right: None,
            direction: MatchDirection::Nearest,
            kind: JoinKind::Left,
            suffixes: JoinSuffixes::default(),
            state: None,
        }
    }

    #[must_use]
    pub fn subject_key(mut self, field: impl Into<String>) -> Self {
        self.subject_key = field.into();
        self
    }

    #[must_use]
    pub fn keep<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.keep_right = Some(fields.iter().map(|f| f.as_ref().to_string()).collect());
        self
    }

    #[must_use]
    pub fn direction(mut self, direction: MatchDirection) -> Self {
        self.direction = direction;
        self
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

/// Index of the chosen record in `days`, which must be sorted ascending.
///
/// With `days` sorted by `(day, input position)`, a backward pick takes the
/// last index of its day and a forward pick the first.
pub fn pick_nearest(days: &[i32], target: i32, direction: MatchDirection) -> Option<usize> {
    let backward = || {
        let idx = days.partition_point(|&day| day <= target);
        idx.checked_sub(1)
    };
    let forward = || {
        let idx = days.partition_point(|&day| day < target);
        (idx < days.len()).then_some(idx)
    };
    match direction {
        MatchDirection::Backward => backward(),
        MatchDirection::Forward => forward(),
        MatchDirection::Nearest => match (backward(), forward()) {
            (Some(before), Some(after)) => {
                let gap_before = i64::from(target) - i64::from(days[before]);
                let gap_after = i64::from(days[after]) - i64::from(target);
                if gap_before <= gap_after {
                    Some(before)
                } else {
                    Some(after)
                }
            }
            (before, after) => before.or(after),
        },
    }
}

/// Attaches to every left row the nearest right row of the same subject.
///
/// Left rows with a null key or date are dropped and counted. In outer mode
/// an unmatched row keeps null right fields; in inner mode it is dropped as
/// `NoMatch`.
pub fn match_nearest(
    left: &SourceFrame,
    right: &SourceFrame,
    join: &NearestJoin,
) -> Result<StageOutput> {
    left.require(&[&join.subject_key, &join.left_time])?;
    right.require(&[&join.subject_key, &join.right_time])?;
    let kept: Vec<String> = match &join.keep_right {
        Some(fields) => {
            right.require(fields)?;
            fields
                .iter()
                .filter(|field| **field != join.subject_key)
                .cloned()
                .collect()
        }
        None => non_key_columns(right, &[&join.subject_key]),
    };

    let mut report = StageReport::new(join.stage.clone(), left.height());
    if let Some(state) = join.state {
        report = report.with_state(state);
    }

    let partitions = partition_right(right, join)?;

    let left_keys = subject_keys(left, &join.subject_key)?;
    let left_days = day_numbers(left, &join.left_time)?;
    let mut missing_key = 0;
    let mut missing_time = 0;
    let mut anchors: Vec<(i64, i32, usize)> = Vec::with_capacity(left.height());
    for (row, (key, day)) in left_keys.iter().zip(&left_days).enumerate() {
        match (key, day) {
            (None, _) => missing_key += 1,
            (Some(_), None) => missing_time += 1,
            (Some(key), Some(day)) => anchors.push((*key, *day, row)),
        }
    }
    report.record_drop(DropReason::MissingSubjectKey, missing_key);
    report.record_drop(DropReason::MissingTimestamp, missing_time);
    anchors.sort_unstable();

    let mut left_rows = Vec::with_capacity(anchors.len());
    let mut right_rows = Vec::with_capacity(anchors.len());
    let mut unmatched = 0;
    for (key, day, row) in anchors {
        let matched = partitions.get(&key).and_then(|partition| {
            pick_nearest(&partition.days, day, join.direction).map(|idx| partition.rows[idx])
        });
        if matched.is_none() && join.kind == JoinKind::Inner {
            unmatched += 1;
            continue;
        }
        left_rows.push(Some(row));
        right_rows.push(matched);
    }
    report.record_drop(DropReason::NoMatch, unmatched);

    let left_part = take_rows(&left.data, &left_rows)?;
    let right_part = take_rows(&right.data.select(kept)?, &right_rows)?;
    let data = attach_columns(&left.name, left_part, right_part, &join.suffixes)?;

    debug!(
        stage = %join.stage,
        left = left.height(),
        right = right.height(),
        output = data.height(),
        matched = right_rows.iter().filter(|row| row.is_some()).count(),
        "nearest join"
    );
    Ok(StageOutput::new(left.with_data(data), report))
}

/// Right rows of one subject, sorted by `(day, input position)`.
struct Partition {
    days: Vec<i32>,
    rows: Vec<usize>,
}

fn partition_right(right: &SourceFrame, join: &NearestJoin) -> Result<HashMap<i64, Partition>> {
    let keys = subject_keys(right, &join.subject_key)?;
    let days = day_numbers(right, &join.right_time)?;
    let mut grouped: HashMap<i64, Vec<(i32, usize)>> = HashMap::new();
    let mut unusable = 0usize;
    for (row, (key, day)) in keys.into_iter().zip(days).enumerate() {
        match (key, day) {
            (Some(key), Some(day)) => grouped.entry(key).or_default().push((day, row)),
            _ => unusable += 1,
        }
    }
    if unusable > 0 {
        debug!(
            stage = %join.stage,
            table = %right.name,
            rows = unusable,
            "right rows without subject key or date are not matchable"
        );
    }
    Ok(grouped
        .into_iter()
        .map(|(key, mut entries)| {
            entries.sort_unstable();
            let (days, rows) = entries.into_iter().unzip();
            (key, Partition { days, rows })
        })
        .collect())
}
