//! Type coercion for subject keys and dates.
//!
//! Values that cannot be coerced become null. Failures are counted per
//! `(table, column)` in the [`IngestReport`] and never abort a load.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::{AnyValue, DataFrame, DataType, Int64Chunked, IntoSeries, NewChunkedArray};
use tracing::warn;

use cohort_common::{any_to_i64, any_to_string, date_series, parse_integral};
use cohort_model::{IngestReport, ParseFailure};

use crate::error::Result;

/// Accepted calendar date layouts, tried in order.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y", "%Y%m%d"];

/// Accepted date-time layouts; the time part is discarded.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Offending values kept per column for diagnostics.
const MAX_EXAMPLES: usize = 3;

/// Parses a date in any accepted layout.
///
/// ```
/// use chrono::NaiveDate;
/// use cohort_ingest::parse_date;
///
/// let expected = NaiveDate::from_ymd_opt(2010, 5, 1);
/// assert_eq!(parse_date("2010-05-01"), expected);
/// assert_eq!(parse_date("05/01/2010"), expected);
/// assert_eq!(parse_date("01-May-2010"), expected);
/// assert_eq!(parse_date("2010-05-01 13:45:00"), expected);
/// assert_eq!(parse_date("not a date"), None);
/// ```
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|datetime| datetime.date())
        })
}

#[derive(Default)]
struct FailureTally {
    count: usize,
    examples: Vec<String>,
}

impl FailureTally {
    fn record(&mut self, value: String) {
        self.count += 1;
        if self.examples.len() < MAX_EXAMPLES {
            self.examples.push(value);
        }
    }

    fn report(self, report: &mut IngestReport, table: &str, column: &str) {
        if self.count == 0 {
            return;
        }
        warn!(
            table,
            column,
            count = self.count,
            "values could not be parsed and were read as null"
        );
        report.parse_failures.push(ParseFailure {
            table: table.to_string(),
            column: column.to_string(),
            count: self.count,
            examples: self.examples,
        });
    }
}

/// Casts the subject key column to `Int64`.
///
/// Accepts integers, whole floats and integer text such as `"12"` or
/// `"12.0"`. A table without the column is left alone.
pub fn coerce_subject_key(
    df: &mut DataFrame,
    table: &str,
    field: &str,
    report: &mut IngestReport,
) -> Result<()> {
    let Ok(column) = df.column(field) else {
        return Ok(());
    };
    if column.dtype() == &DataType::Int64 {
        return Ok(());
    }

    let mut tally = FailureTally::default();
    let mut keys = Vec::with_capacity(column.len());
    for idx in 0..column.len() {
        let value = column.get(idx).unwrap_or(AnyValue::Null);
        if matches!(value, AnyValue::Null) {
            keys.push(None);
            continue;
        }
        let text = any_to_string(value.clone());
        if text.trim().is_empty() {
            keys.push(None);
            continue;
        }
        let key = any_to_i64(value).or_else(|| parse_integral(&text));
        if key.is_none() {
            tally.record(text);
        }
        keys.push(key);
    }

    let coerced = Int64Chunked::from_iter_options(field.into(), keys.into_iter()).into_series();
    df.with_column(coerced)?;
    tally.report(report, table, field);
    Ok(())
}

/// Parses a date column to polars `Date`.
///
/// Date-times are truncated to their date. A table without the column is
/// left alone.
pub fn coerce_date(
    df: &mut DataFrame,
    table: &str,
    field: &str,
    report: &mut IngestReport,
) -> Result<()> {
    let Ok(column) = df.column(field) else {
        return Ok(());
    };
    match column.dtype() {
        DataType::Date => return Ok(()),
        DataType::Datetime(_, _) => {
            let cast = column.cast(&DataType::Date)?;
            df.with_column(cast)?;
            return Ok(());
        }
        _ => {}
    }

    let mut tally = FailureTally::default();
    let mut dates = Vec::with_capacity(column.len());
    for idx in 0..column.len() {
        let value = column.get(idx).unwrap_or(AnyValue::Null);
        let text = any_to_string(value);
        if text.trim().is_empty() {
            dates.push(None);
            continue;
        }
        let date = parse_date(&text);
        if date.is_none() {
            tally.record(text);
        }
        dates.push(date);
    }

    let parsed = date_series(field, dates)?;
    df.with_column(parsed)?;
    tally.report(report, table, field);
    Ok(())
}

#[cfg(test)]
mod tests {
    use polars::prelude::{IntoColumn, NamedFrom, Series};

    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2010, 5, 1);
        for text in [
            "2010-05-01",
            "2010/05/01",
            "05/01/2010",
            "01-May-2010",
            "20100501",
            "2010-05-01T08:30:00",
            "2010-05-01 08:30:00.250",
            " 2010-05-01 ",
        ] {
            assert_eq!(parse_date(text), expected, "{text}");
        }
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2010-13-01"), None);
    }

    #[test]
    fn test_coerce_subject_key_counts_failures() {
        let mut df = DataFrame::new(vec![
            Series::new("RID".into(), vec![Some("12"), Some("13.0"), Some("x"), None, Some(" ")])
                .into_column(),
        ])
        .unwrap();
        let mut report = IngestReport::default();
        coerce_subject_key(&mut df, "registry", "RID", &mut report).unwrap();

        let keys: Vec<Option<i64>> = df.column("RID").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(keys, vec![Some(12), Some(13), None, None, None]);
        assert_eq!(report.parse_failures.len(), 1);
        assert_eq!(report.parse_failures[0].count, 1);
        assert_eq!(report.parse_failures[0].examples, vec!["x"]);
    }

    #[test]
    fn test_coerce_date_counts_failures() {
        let mut df = DataFrame::new(vec![
            Series::new(
                "SCANDATE".into(),
                vec![Some("2010-05-01"), Some("garbage"), None, Some("05/02/2010")],
            )
            .into_column(),
        ])
        .unwrap();
        let mut report = IngestReport::default();
        coerce_date(&mut df, "taupet", "SCANDATE", &mut report).unwrap();

        let column = df.column("SCANDATE").unwrap();
        assert_eq!(column.dtype(), &DataType::Date);
        assert_eq!(column.null_count(), 2);
        assert_eq!(report.total_parse_failures(), 1);
        assert_eq!(report.parse_failures[0].table, "taupet");
    }

    #[test]
    fn test_integer_dates_are_parsed() {
        let mut df =
            DataFrame::new(vec![Series::new("EXAMDATE".into(), vec![20100501i64]).into_column()])
                .unwrap();
        let mut report = IngestReport::default();
        coerce_date(&mut df, "registry", "EXAMDATE", &mut report).unwrap();
        assert_eq!(df.column("EXAMDATE").unwrap().null_count(), 0);
        assert_eq!(report.total_parse_failures(), 0);
    }

    #[test]
    fn test_absent_columns_are_ignored() {
        let mut df = DataFrame::new(vec![Series::new("A".into(), vec![1i64]).into_column()]).unwrap();
        let mut report = IngestReport::default();
        coerce_date(&mut df, "t", "SCANDATE", &mut report).unwrap();
        coerce_subject_key(&mut df, "t", "RID", &mut report).unwrap();
        assert_eq!(df.width(), 1);
    }
}
