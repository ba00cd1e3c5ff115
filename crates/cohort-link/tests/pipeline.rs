//! End-to-end linkage on a small synthetic cohort.

use chrono::NaiveDate;
use cohort_common::{date_series, date_to_days};
use cohort_link::{CohortSources, ModalitySources, SourceFrame, link_cohort};
use cohort_model::{DropReason, LinkOptions, RegionCatalog, ScanState};
use polars::prelude::{Column, DataFrame, DataType, IntoColumn, NamedFrom, Series};

fn day(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
}

fn dates(name: &str, values: &[Option<&str>]) -> Column {
    date_series(name, values.iter().map(|value| value.map(day)))
        .unwrap()
        .into_column()
}

fn ids(values: &[i64]) -> Column {
    Series::new("RID".into(), values.to_vec()).into_column()
}

fn text(name: &str, values: &[&str]) -> Column {
    Series::new(name.into(), values.to_vec()).into_column()
}

fn floats(name: &str, values: &[f64]) -> Column {
    Series::new(name.into(), values.to_vec()).into_column()
}

fn table(name: &str, columns: Vec<Column>) -> SourceFrame {
    SourceFrame::new(name, DataFrame::new(columns).unwrap())
}

fn sources() -> CohortSources {
    let primary = ModalitySources {
        metadata: table(
            "taumeta",
            vec![
                ids(&[1, 2, 3]),
                text("VISCODE", &["bl", "bl", "bl"]),
                dates("SCANDATE", &[Some("2010-05-01"), Some("2011-01-01"), None]),
            ],
        ),
        qc: table(
            "tau_qc",
            vec![
                ids(&[1, 2, 3]),
                text("VISCODE", &["bl", "bl", "bl"]),
                text("VISCODE2", &["bl", "bl", "bl"]),
                dates("SCANDATE", &[Some("2010-05-02"), Some("2011-01-01"), Some("2011-02-01")]),
            ],
        ),
        pet: table(
            "taupet",
            vec![
                ids(&[1, 1, 2, 3]),
                text("VISCODE", &["bl", "bl", "bl", "bl"]),
                dates(
                    "SCANDATE",
                    &[
                        Some("2010-05-01"),
                        Some("2010-05-01"),
                        Some("2011-01-01"),
                        Some("2011-02-01"),
                    ],
                ),
                floats("QC_FLAG", &[2.0, 2.0, 2.0, 2.0]),
                text("TRACER", &["FTP", "MK6240", "FTP", "FTP"]),
                floats("CTX_LH_A_SUVR", &[1.2, 1.9, 1.3, 1.4]),
                floats("LEFT_THALAMUS_SUVR", &[1.5, 1.5, 1.5, 1.5]),
            ],
        ),
    };
    let secondary = ModalitySources {
        metadata: table(
            "amymeta",
            vec![
                ids(&[1, 2]),
                dates("SCANDATE", &[Some("2010-08-01"), Some("2012-03-01")]),
            ],
        ),
        qc: table(
            "amyqc",
            vec![
                ids(&[1, 2]),
                dates("SCANDATE", &[Some("2010-08-01"), Some("2012-03-01")]),
                text("VISCODE", &["m03", "m12"]),
                text("VISCODE2", &["m03", "m12"]),
            ],
        ),
        pet: table(
            "amy_data",
            vec![
                ids(&[1, 2]),
                text("VISCODE", &["m03", "m12"]),
                dates("SCANDATE", &[Some("2010-08-01"), Some("2012-03-01")]),
                floats("QC_FLAG", &[2.0, 2.0]),
                floats("CTX_LH_A_SUVR", &[0.9, 1.0]),
            ],
        ),
    };
    CohortSources {
        primary,
        secondary,
        registry: table(
            "registry",
            vec![
                ids(&[1, 1, 2, 3]),
                text("VISCODE", &["bl", "m01", "bl", "bl"]),
                text("VISCODE2", &["bl", "m01", "bl", "bl"]),
                dates(
                    "EXAMDATE",
                    &[
                        Some("2010-04-28"),
                        Some("2010-06-01"),
                        Some("2011-01-01"),
                        Some("2011-02-01"),
                    ],
                ),
            ],
        ),
        assessments: table(
            "ADNIMERGE",
            vec![
                ids(&[1, 2, 3]),
                text("VISCODE", &["bl", "bl", "bl"]),
                dates("EXAMDATE", &[Some("2010-04-20"), Some("2011-01-05"), Some("2011-02-01")]),
                dates(
                    "EXAMDATE_BL",
                    &[Some("2010-04-20"), Some("2011-01-05"), Some("2011-02-01")],
                ),
                floats("AGE", &[70.0, 65.0, 80.0]),
                text("DX", &["CN", "MCI", "AD"]),
            ],
        ),
        genotypes: table(
            "apoe4",
            vec![ids(&[1, 2, 1]), text("GENOTYPE", &["3/3", "3/3", "3/4"])],
        ),
    }
}

fn catalog() -> RegionCatalog {
    RegionCatalog::from_labels(&["ctx-lh-a", "Left-Thalamus", "ctx-rh-b"], &[1])
}

fn day_at(frame: &SourceFrame, column: &str, row: usize) -> Option<i32> {
    frame
        .data
        .column(column)
        .unwrap()
        .cast(&DataType::Int32)
        .unwrap()
        .i32()
        .unwrap()
        .get(row)
}

#[test]
fn links_single_subject_within_tolerance() {
    let output = link_cohort(&sources(), &catalog(), &LinkOptions::default()).unwrap();
    let frame = &output.frame;

    assert_eq!(frame.height(), 1);
    let rid = frame.data.column("RID").unwrap().i64().unwrap().get(0);
    assert_eq!(rid, Some(1));

    // scan 2010-05-01 sits between visits 2010-04-28 and 2010-06-01
    assert_eq!(
        day_at(frame, "EXAMDATE_TAU", 0),
        Some(date_to_days(day("2010-04-28")))
    );
    let visit = frame.data.column("VISCODE_REG_TAU").unwrap().str().unwrap().get(0);
    assert_eq!(visit, Some("bl"));

    let gap = frame
        .data
        .column("AMY_TAU_SCANDIFF_DAYS")
        .unwrap()
        .i64()
        .unwrap()
        .get(0);
    assert_eq!(gap, Some(92));

    let apoe4 = frame.data.column("APOE4").unwrap().f64().unwrap().get(0);
    assert_eq!(apoe4, Some(1.0));

    let age = frame.data.column("AGE_AT_SCAN").unwrap().f64().unwrap().get(0).unwrap();
    assert!((age - (70.0 + 11.0 / 365.25)).abs() < 1e-9);
}

#[test]
fn region_columns_close_the_table() {
    let output = link_cohort(&sources(), &catalog(), &LinkOptions::default()).unwrap();
    let names = output.frame.column_names();
    assert_eq!(
        &names[names.len() - 2..],
        &["CTX_LH_A_SUVR_TAU".to_string(), "CTX_LH_A_SUVR_AMY".to_string()]
    );
    assert!(!names.iter().any(|name| name == "LEFT_THALAMUS_SUVR"));
    assert_eq!(output.selection.mismatches.len(), 1);
    assert_eq!(output.selection.mismatches[0].region_label, "ctx-rh-b");
    assert_eq!(output.shape(), (1, names.len()));
}

#[test]
fn every_drop_is_accounted_for() {
    let output = link_cohort(&sources(), &catalog(), &LinkOptions::default()).unwrap();
    let report = output.run_report();

    assert_eq!(report.dropped(DropReason::ExcludedCategory), 1);
    assert_eq!(report.dropped(DropReason::MissingCovariate), 1);
    assert_eq!(report.dropped(DropReason::ToleranceRejection), 1);
    assert_eq!(report.dropped(DropReason::NoCrossModalityMatch), 0);
    assert_eq!(report.output_rows, 1);

    let tolerance = report.stage("tolerance").unwrap();
    assert_eq!(tolerance.state, Some(ScanState::Accepted));
    assert_eq!(tolerance.input_rows, 2);
    assert_eq!(tolerance.output_rows, 1);
}

#[test]
fn wider_tolerance_keeps_distant_pairs() {
    let options = LinkOptions {
        tolerance_days: 1000,
        ..LinkOptions::default()
    };
    let output = link_cohort(&sources(), &catalog(), &options).unwrap();
    assert_eq!(output.frame.height(), 2);
}

#[test]
fn missing_registry_column_aborts() {
    let mut sources = sources();
    sources.registry = sources
        .registry
        .with_data(sources.registry.data.drop("EXAMDATE").unwrap());
    let err = link_cohort(&sources, &catalog(), &LinkOptions::default()).unwrap_err();
    assert!(err.to_string().contains("'EXAMDATE'"));
    assert!(err.to_string().contains("'registry'"));
}

#[test]
fn invalid_options_are_rejected() {
    let options = LinkOptions {
        tolerance_days: 0,
        ..LinkOptions::default()
    };
    assert!(link_cohort(&sources(), &catalog(), &options).is_err());
}
