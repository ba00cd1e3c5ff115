//! Behaviour of the grouped nearest-in-time matcher on whole tables.

use cohort_link::{JoinSuffixes, LinkError, NearestJoin, SourceFrame, match_nearest};
use cohort_model::{DropReason, JoinKind, MatchDirection};
use polars::prelude::{Column, DataFrame, DataType, IntoColumn, NamedFrom, Series};
use proptest::prelude::*;

fn day_column(name: &str, days: &[Option<i32>]) -> Column {
    Series::new(name.into(), days.to_vec())
        .cast(&DataType::Date)
        .unwrap()
        .into_column()
}

fn scans(rids: &[Option<i64>], days: &[Option<i32>]) -> SourceFrame {
    let rows: Vec<i64> = (0..rids.len() as i64).collect();
    SourceFrame::new(
        "scans",
        DataFrame::new(vec![
            Series::new("RID".into(), rids.to_vec()).into_column(),
            day_column("SCANDATE", days),
            Series::new("ROW".into(), rows).into_column(),
        ])
        .unwrap(),
    )
}

fn visits(rids: &[i64], days: &[i32]) -> SourceFrame {
    let codes: Vec<String> = (0..rids.len()).map(|idx| format!("v{idx}")).collect();
    let days: Vec<Option<i32>> = days.iter().copied().map(Some).collect();
    SourceFrame::new(
        "registry",
        DataFrame::new(vec![
            Series::new("RID".into(), rids.to_vec()).into_column(),
            Series::new("SRC_RID".into(), rids.to_vec()).into_column(),
            day_column("EXAMDATE", &days),
            Series::new("VISCODE".into(), codes).into_column(),
        ])
        .unwrap(),
    )
}

fn visit_join() -> NearestJoin {
    NearestJoin::new("visit", "SCANDATE", "EXAMDATE")
}

fn i64_values(frame: &SourceFrame, name: &str) -> Vec<Option<i64>> {
    frame.data.column(name).unwrap().i64().unwrap().into_iter().collect()
}

fn day_values(frame: &SourceFrame, name: &str) -> Vec<Option<i32>> {
    frame
        .data
        .column(name)
        .unwrap()
        .cast(&DataType::Int32)
        .unwrap()
        .i32()
        .unwrap()
        .into_iter()
        .collect()
}

fn codes(frame: &SourceFrame) -> Vec<Option<String>> {
    frame
        .data
        .column("VISCODE")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|code| code.map(str::to_string))
        .collect()
}

#[test]
fn picks_closest_candidate() {
    let t = 1000;
    let left = scans(&[Some(1)], &[Some(t)]);
    let right = visits(&[1, 1, 1], &[t - 3, t + 1, t + 10]);
    let output = match_nearest(&left, &right, &visit_join()).unwrap();
    assert_eq!(day_values(&output.frame, "EXAMDATE"), vec![Some(t + 1)]);
}

#[test]
fn equal_distance_picks_earlier_record_every_time() {
    let t = 1000;
    let left = scans(&[Some(1)], &[Some(t)]);
    let right = visits(&[1, 1], &[t + 2, t - 2]);
    for _ in 0..5 {
        let output = match_nearest(&left, &right, &visit_join()).unwrap();
        assert_eq!(day_values(&output.frame, "EXAMDATE"), vec![Some(t - 2)]);
    }
}

#[test]
fn same_day_records_ahead_resolve_to_first_in_input_order() {
    let left = scans(&[Some(1)], &[Some(10)]);
    let right = visits(&[1, 1, 1], &[12, 12, 30]);
    let output = match_nearest(&left, &right, &visit_join()).unwrap();
    assert_eq!(codes(&output.frame), vec![Some("v0".to_string())]);
}

#[test]
fn same_day_records_at_or_behind_resolve_to_last_in_input_order() {
    let right = visits(&[1, 1, 1], &[12, 12, 30]);
    let exact = match_nearest(&scans(&[Some(1)], &[Some(12)]), &right, &visit_join()).unwrap();
    assert_eq!(codes(&exact.frame), vec![Some("v1".to_string())]);

    let behind = match_nearest(&scans(&[Some(1)], &[Some(14)]), &right, &visit_join()).unwrap();
    assert_eq!(codes(&behind.frame), vec![Some("v1".to_string())]);
}

#[test]
fn subject_without_right_rows_keeps_null_fields() {
    let left = scans(&[Some(1), Some(2)], &[Some(10), Some(10)]);
    let right = visits(&[1], &[11]);
    let output = match_nearest(&left, &right, &visit_join()).unwrap();
    assert_eq!(output.frame.height(), 2);
    assert_eq!(i64_values(&output.frame, "RID"), vec![Some(1), Some(2)]);
    assert_eq!(day_values(&output.frame, "EXAMDATE"), vec![Some(11), None]);
    assert_eq!(output.report.total_dropped(), 0);
}

#[test]
fn inner_kind_drops_unmatched_rows() {
    let left = scans(&[Some(1), Some(2)], &[Some(10), Some(10)]);
    let right = visits(&[1], &[11]);
    let join = visit_join().kind(JoinKind::Inner);
    let output = match_nearest(&left, &right, &join).unwrap();
    assert_eq!(output.frame.height(), 1);
    assert_eq!(output.report.dropped(DropReason::NoMatch), 1);
}

#[test]
fn never_matches_across_subjects() {
    let left = scans(&[Some(1), Some(2)], &[Some(100), Some(100)]);
    let right = visits(&[2, 1], &[100, 500]);
    let output = match_nearest(&left, &right, &visit_join()).unwrap();
    assert_eq!(i64_values(&output.frame, "SRC_RID"), vec![Some(1), Some(2)]);
    assert_eq!(day_values(&output.frame, "EXAMDATE"), vec![Some(500), Some(100)]);
}

#[test]
fn rows_without_key_or_date_are_dropped_and_counted() {
    let left = scans(&[None, Some(1), Some(1)], &[Some(5), None, Some(5)]);
    let right = visits(&[1], &[5]);
    let output = match_nearest(&left, &right, &visit_join()).unwrap();
    assert_eq!(output.frame.height(), 1);
    assert_eq!(output.report.dropped(DropReason::MissingSubjectKey), 1);
    assert_eq!(output.report.dropped(DropReason::MissingTimestamp), 1);
    assert_eq!(output.report.input_rows, 3);
    assert_eq!(output.report.output_rows, 1);
}

#[test]
fn output_is_sorted_by_subject_then_date() {
    let left = scans(&[Some(2), Some(1), Some(1)], &[Some(1), Some(9), Some(3)]);
    let right = visits(&[1, 2], &[1, 1]);
    let output = match_nearest(&left, &right, &visit_join()).unwrap();
    assert_eq!(i64_values(&output.frame, "ROW"), vec![Some(2), Some(1), Some(0)]);
}

#[test]
fn directional_joins_only_look_one_way() {
    let left = scans(&[Some(1)], &[Some(10)]);
    let right = visits(&[1, 1], &[9, 20]);
    let forward = match_nearest(&left, &right, &visit_join().direction(MatchDirection::Forward))
        .unwrap();
    assert_eq!(day_values(&forward.frame, "EXAMDATE"), vec![Some(20)]);
    let backward = match_nearest(&left, &right, &visit_join().direction(MatchDirection::Backward))
        .unwrap();
    assert_eq!(day_values(&backward.frame, "EXAMDATE"), vec![Some(9)]);
}

#[test]
fn kept_fields_collide_with_suffix() {
    let left = scans(&[Some(1)], &[Some(10)]);
    let left = left.with_data(
        left.data
            .hstack(&[Series::new("VISCODE".into(), vec!["bl"]).into_column()])
            .unwrap(),
    );
    let right = visits(&[1], &[10]);
    let join = visit_join()
        .keep(&["VISCODE", "EXAMDATE"])
        .suffixes(JoinSuffixes::right("_REG"));
    let output = match_nearest(&left, &right, &join).unwrap();
    assert_eq!(
        output.frame.column_names(),
        vec!["RID", "SCANDATE", "ROW", "VISCODE", "VISCODE_REG", "EXAMDATE"]
    );
}

#[test]
fn suffixed_name_taken_by_left_is_rejected() {
    let left = scans(&[Some(1)], &[Some(10)]);
    let left = left.with_data(
        left.data
            .hstack(&[
                Series::new("VISCODE".into(), vec!["bl"]).into_column(),
                Series::new("VISCODE_REG".into(), vec!["bl"]).into_column(),
            ])
            .unwrap(),
    );
    let right = visits(&[1], &[10]);
    let join = visit_join()
        .keep(&["VISCODE", "EXAMDATE"])
        .suffixes(JoinSuffixes::right("_REG"));
    match match_nearest(&left, &right, &join).unwrap_err() {
        LinkError::ColumnCollision { table, column } => {
            assert_eq!(table, "scans");
            assert_eq!(column, "VISCODE_REG");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn shared_columns_take_default_suffixes() {
    let left = scans(&[Some(1)], &[Some(10)]);
    let left = left.with_data(
        left.data
            .hstack(&[Series::new("VISCODE".into(), vec!["bl"]).into_column()])
            .unwrap(),
    );
    let right = visits(&[1], &[10]);
    let output = match_nearest(&left, &right, &visit_join()).unwrap();
    assert_eq!(
        output.frame.column_names(),
        vec!["RID", "SCANDATE", "ROW", "VISCODE_x", "SRC_RID", "EXAMDATE", "VISCODE_y"]
    );
}

#[test]
fn missing_fields_are_schema_errors() {
    let left = scans(&[Some(1)], &[Some(10)]);
    let right = visits(&[1], &[10]);
    let err = match_nearest(&left, &right, &visit_join().keep(&["VISCODE2"])).unwrap_err();
    match err {
        LinkError::Schema { table, field } => {
            assert_eq!(table, "registry");
            assert_eq!(field, "VISCODE2");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn text_dates_are_rejected() {
    let left = SourceFrame::new(
        "scans",
        DataFrame::new(vec![
            Series::new("RID".into(), vec![1i64]).into_column(),
            Series::new("SCANDATE".into(), vec!["2010-05-01"]).into_column(),
        ])
        .unwrap(),
    );
    let right = visits(&[1], &[10]);
    let err = match_nearest(&left, &right, &visit_join()).unwrap_err();
    assert!(matches!(err, LinkError::TimeType { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn matches_stay_within_subject_and_are_nearest(
        left_rows in prop::collection::vec((1i64..5, 0i32..60), 1..20),
        right_rows in prop::collection::vec((1i64..5, 0i32..60), 0..20),
    ) {
        let left_rids: Vec<Option<i64>> = left_rows.iter().map(|(rid, _)| Some(*rid)).collect();
        let left_days: Vec<Option<i32>> = left_rows.iter().map(|(_, day)| Some(*day)).collect();
        let right_rids: Vec<i64> = right_rows.iter().map(|(rid, _)| *rid).collect();
        let right_days: Vec<i32> = right_rows.iter().map(|(_, day)| *day).collect();

        let output = match_nearest(
            &scans(&left_rids, &left_days),
            &visits(&right_rids, &right_days),
            &visit_join(),
        )
        .unwrap();
        prop_assert_eq!(output.frame.height(), left_rows.len());

        let rids = i64_values(&output.frame, "RID");
        let sources = i64_values(&output.frame, "SRC_RID");
        let scan_days = day_values(&output.frame, "SCANDATE");
        let exam_days = day_values(&output.frame, "EXAMDATE");
        for idx in 0..rids.len() {
            let rid = rids[idx].unwrap();
            let day = scan_days[idx].unwrap();
            let candidates: Vec<i32> = right_rows
                .iter()
                .filter(|(r, _)| *r == rid)
                .map(|(_, d)| *d)
                .collect();
            match sources[idx] {
                None => prop_assert!(candidates.is_empty()),
                Some(source) => {
                    prop_assert_eq!(source, rid);
                    let best = candidates.iter().map(|d| (d - day).abs()).min().unwrap();
                    let matched = exam_days[idx].unwrap();
                    prop_assert_eq!((matched - day).abs(), best);
                    if best > 0 && candidates.contains(&(day - best)) {
                        prop_assert_eq!(matched, day - best);
                    }
                }
            }
        }
    }

    #[test]
    fn result_does_not_depend_on_right_order(
        right_rows in prop::collection::vec((1i64..4, 0i32..30), 1..15),
        target_day in 0i32..30,
    ) {
        let mut reversed = right_rows.clone();
        reversed.reverse();
        let left = scans(&[Some(1), Some(2), Some(3)], &[Some(target_day), Some(target_day), Some(target_day)]);
        let run = |rows: &[(i64, i32)]| {
            let rids: Vec<i64> = rows.iter().map(|(rid, _)| *rid).collect();
            let days: Vec<i32> = rows.iter().map(|(_, day)| *day).collect();
            let join = visit_join().keep(&["EXAMDATE"]);
            let output = match_nearest(&left, &visits(&rids, &days), &join).unwrap();
            day_values(&output.frame, "EXAMDATE")
        };
        prop_assert_eq!(run(&right_rows), run(&reversed));
    }
}
