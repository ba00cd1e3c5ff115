//! Column extraction and row-assembly helpers shared by the join stages.

use std::collections::HashSet;

use polars::prelude::{
    AnyValue, BooleanChunked, DataFrame, DataType, IdxCa, IdxSize, NewChunkedArray, PlSmallStr,
};

use cohort_common::{any_to_i64, any_to_key_text};

use crate::error::{LinkError, Result};
use crate::frame::SourceFrame;

/// Separator between parts of a composite key; never present in CSV text.
const KEY_SEPARATOR: char = '\u{1f}';

/// Subject keys as integers, `None` where missing or not integer-like.
pub(crate) fn subject_keys(frame: &SourceFrame, field: &str) -> Result<Vec<Option<i64>>> {
    let column = frame.column(field)?;
    if column.dtype() == &DataType::Int64 {
        return Ok(column.i64()?.into_iter().collect());
    }
    let mut keys = Vec::with_capacity(column.len());
    for idx in 0..column.len() {
        keys.push(any_to_i64(column.get(idx).unwrap_or(AnyValue::Null)));
    }
    Ok(keys)
}

/// Dates as days since the Unix epoch, `None` where missing.
pub(crate) fn day_numbers(frame: &SourceFrame, field: &str) -> Result<Vec<Option<i32>>> {
    let column = frame.column(field)?;
    let days = match column.dtype() {
        DataType::Date => column.cast(&DataType::Int32)?,
        DataType::Datetime(_, _) => column.cast(&DataType::Date)?.cast(&DataType::Int32)?,
        other => {
            return Err(LinkError::TimeType {
                table: frame.name.clone(),
                field: field.to_string(),
                dtype: other.clone(),
            });
        }
    };
    Ok(days.i32()?.into_iter().collect())
}

/// Composite text keys, `None` when any part is missing.
pub(crate) fn composite_keys<S: AsRef<str>>(
    frame: &SourceFrame,
    fields: &[S],
) -> Result<Vec<Option<String>>> {
    let columns = fields
        .iter()
        .map(|field| frame.column(field.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let mut keys = Vec::with_capacity(frame.height());
    for idx in 0..frame.height() {
        let mut composite = String::new();
        let mut complete = true;
        for (pos, column) in columns.iter().enumerate() {
            let Some(part) = any_to_key_text(column.get(idx).unwrap_or(AnyValue::Null)) else {
                complete = false;
                break;
            };
            if pos > 0 {
                composite.push(KEY_SEPARATOR);
            }
            composite.push_str(&part);
        }
        keys.push(complete.then_some(composite));
    }
    Ok(keys)
}

/// Row-wise null flags: true where any of `fields` is null.
pub(crate) fn any_null<S: AsRef<str>>(frame: &SourceFrame, fields: &[S]) -> Result<Vec<bool>> {
    let mut flags = vec![false; frame.height()];
    for field in fields {
        let column = frame.column(field.as_ref())?;
        if column.null_count() == 0 {
            continue;
        }
        let nulls = column.is_null();
        for (flag, is_null) in flags.iter_mut().zip(nulls.into_iter()) {
            if is_null.unwrap_or(true) {
                *flag = true;
            }
        }
    }
    Ok(flags)
}

/// Keeps rows whose flag is true, preserving order.
pub(crate) fn filter_rows(data: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    Ok(data.filter(&mask)?)
}

/// Gathers rows by position; `None` positions become all-null rows.
pub(crate) fn take_rows(data: &DataFrame, rows: &[Option<usize>]) -> Result<DataFrame> {
    let indices = IdxCa::from_iter_options(
        PlSmallStr::from_static("take"),
        rows.iter().map(|row| row.map(|idx| idx as IdxSize)),
    );
    Ok(data.take(&indices)?)
}

/// Collision suffixes applied when both sides of a join carry a column name.
///
/// An empty left suffix keeps left names as they are. The default is the
/// pandas pair `_x` / `_y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSuffixes {
    pub left: String,
    pub right: String,
}

impl Default for JoinSuffixes {
    fn default() -> Self {
        Self::both("_x", "_y")
    }
}

impl JoinSuffixes {
    /// Only the attached (right) side is renamed.
    pub fn right(suffix: impl Into<String>) -> Self {
        Self {
            left: String::new(),
            right: suffix.into(),
        }
    }

    /// Both sides of a collision are renamed.
    pub fn both(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

fn column_names(data: &DataFrame) -> Vec<String> {
    data.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Places `right` columns after `left` columns, suffixing name collisions.
///
/// Fails with [`LinkError::ColumnCollision`] when a suffixed name is still
/// taken on either side.
pub(crate) fn attach_columns(
    table: &str,
    mut left: DataFrame,
    mut right: DataFrame,
    suffixes: &JoinSuffixes,
) -> Result<DataFrame> {
    let left_names = column_names(&left);
    let right_names = column_names(&right);
    let collides = |name: &String| left_names.contains(name) && right_names.contains(name);
    let left_out: Vec<String> = left_names
        .iter()
        .map(|name| {
            if collides(name) {
                format!("{name}{}", suffixes.left)
            } else {
                name.clone()
            }
        })
        .collect();
    let right_out: Vec<String> = right_names
        .iter()
        .map(|name| {
            if collides(name) {
                format!("{name}{}", suffixes.right)
            } else {
                name.clone()
            }
        })
        .collect();

    let mut seen = HashSet::with_capacity(left_out.len() + right_out.len());
    for name in left_out.iter().chain(&right_out) {
        if !seen.insert(name.as_str()) {
            return Err(LinkError::ColumnCollision {
                table: table.to_string(),
                column: name.clone(),
            });
        }
    }
    left.set_column_names(left_out)?;
    right.set_column_names(right_out)?;
    Ok(left.hstack(right.get_columns())?)
}

/// Right-hand columns to carry through a join: everything but the keys.
pub(crate) fn non_key_columns<S: AsRef<str>>(frame: &SourceFrame, keys: &[S]) -> Vec<String> {
    frame
        .column_names()
        .into_iter()
        .filter(|name| !keys.iter().any(|key| key.as_ref() == name))
        .collect()
}

#[cfg(test)]
mod tests {
    use polars::prelude::{Column, IntoColumn, NamedFrom, Series};

    use super::*;

    fn frame(columns: Vec<Column>) -> SourceFrame {
        SourceFrame::new("test", DataFrame::new(columns).unwrap())
    }

    #[test]
    fn composite_keys_skip_incomplete_rows() {
        let frame = frame(vec![
            Series::new("RID".into(), vec![Some(1i64), Some(2), None]).into_column(),
            Series::new("VISCODE".into(), vec![Some("bl"), None, Some("m12")]).into_column(),
        ]);
        let keys = composite_keys(&frame, &["RID", "VISCODE"]).unwrap();
        assert_eq!(keys[0].as_deref(), Some("1\u{1f}bl"));
        assert_eq!(keys[1], None);
        assert_eq!(keys[2], None);
    }

    #[test]
    fn subject_keys_accept_text_ids() {
        let frame = frame(vec![
            Series::new("RID".into(), vec!["7", "7.0", "x"]).into_column(),
        ]);
        assert_eq!(subject_keys(&frame, "RID").unwrap(), vec![Some(7), Some(7), None]);
    }

    #[test]
    fn day_numbers_reject_text_columns() {
        let frame = frame(vec![
            Series::new("SCANDATE".into(), vec!["2010-05-01"]).into_column(),
        ]);
        let err = day_numbers(&frame, "SCANDATE").unwrap_err();
        assert!(matches!(err, LinkError::TimeType { .. }));
    }

    #[test]
    fn take_rows_fills_missing_positions_with_nulls() {
        let data = DataFrame::new(vec![
            Series::new("A".into(), vec![10i64, 20]).into_column(),
        ])
        .unwrap();
        let taken = take_rows(&data, &[Some(1), None, Some(0)]).unwrap();
        let values: Vec<Option<i64>> = taken.column("A").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(20), None, Some(10)]);
    }

    #[test]
    fn attach_columns_suffixes_collisions() {
        let left = DataFrame::new(vec![
            Series::new("RID".into(), vec![1i64]).into_column(),
            Series::new("VISCODE".into(), vec!["bl"]).into_column(),
        ])
        .unwrap();
        let right = DataFrame::new(vec![
            Series::new("VISCODE".into(), vec!["sc"]).into_column(),
            Series::new("EXAMDATE".into(), vec![1i32]).into_column(),
        ])
        .unwrap();
        let joined =
            attach_columns("scans", left.clone(), right.clone(), &JoinSuffixes::right("_REG"))
                .unwrap();
        let names: Vec<String> = joined.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["RID", "VISCODE", "VISCODE_REG", "EXAMDATE"]);

        let both =
            attach_columns("scans", left, right, &JoinSuffixes::both("_TAU", "_AMY")).unwrap();
        let names: Vec<String> = both.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["RID", "VISCODE_TAU", "VISCODE_AMY", "EXAMDATE"]);
    }

    #[test]
    fn default_suffixes_rename_both_sides() {
        let left = DataFrame::new(vec![
            Series::new("VISCODE".into(), vec!["bl"]).into_column(),
        ])
        .unwrap();
        let right = DataFrame::new(vec![
            Series::new("VISCODE".into(), vec!["sc"]).into_column(),
        ])
        .unwrap();
        let joined = attach_columns("scans", left, right, &JoinSuffixes::default()).unwrap();
        let names: Vec<String> = joined.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["VISCODE_x", "VISCODE_y"]);
    }

    #[test]
    fn empty_suffix_collision_names_table_and_column() {
        let left = DataFrame::new(vec![
            Series::new("VISCODE".into(), vec!["bl"]).into_column(),
        ])
        .unwrap();
        let right = left.clone();
        let err = attach_columns("scans", left, right, &JoinSuffixes::right("")).unwrap_err();
        match err {
            LinkError::ColumnCollision { table, column } => {
                assert_eq!(table, "scans");
                assert_eq!(column, "VISCODE");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn suffixed_name_already_on_left_is_a_collision() {
        let left = DataFrame::new(vec![
            Series::new("VISCODE".into(), vec!["bl"]).into_column(),
            Series::new("VISCODE_REG".into(), vec!["bl"]).into_column(),
        ])
        .unwrap();
        let right = DataFrame::new(vec![
            Series::new("VISCODE".into(), vec!["sc"]).into_column(),
        ])
        .unwrap();
        let err = attach_columns("scans", left, right, &JoinSuffixes::right("_REG")).unwrap_err();
        assert!(
            matches!(err, LinkError::ColumnCollision { ref column, .. } if column == "VISCODE_REG")
        );
    }
}
