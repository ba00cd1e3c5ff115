use std::path::Path;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use cohort_cli::logging::redact_value;
use cohort_model::{CatalogMismatch, ParseFailure, StageReport};

use crate::types::LinkResult;

pub fn print_summary(result: &LinkResult) {
    print_stage_table(&result.report.stages);
    print_parse_failures(&result.report.ingest.parse_failures);
    print_mismatches(&result.report.catalog_mismatches);

    println!();
    print_path("Data", &result.data_dir);
    match &result.output {
        Some(path) => print_path("Cohort", path),
        None => println!("Cohort: not written (dry run)"),
    }
    if let Some(path) = &result.report_path {
        print_path("Report", path);
    }
    let (rows, columns) = result.shape();
    println!("Final matched dataset: ({rows}, {columns})");
}

fn print_path(label: &str, path: &Path) {
    println!("{label}: {}", path.display());
}

fn print_stage_table(stages: &[StageReport]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stage"),
        header_cell("State"),
        header_cell("In"),
        header_cell("Out"),
        header_cell("Dropped"),
        header_cell("Reasons"),
    ]);
    apply_table_style(&mut table);
    for index in 2..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let mut total_dropped = 0usize;
    for stage in stages {
        let dropped = stage.total_dropped();
        total_dropped += dropped;
        table.add_row(vec![
            Cell::new(&stage.stage),
            state_cell(stage),
            Cell::new(stage.input_rows),
            Cell::new(stage.output_rows),
            count_cell(Some(dropped), Color::Yellow),
            reasons_cell(stage),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL").add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
        count_cell(Some(total_dropped), Color::Yellow),
        dim_cell("-"),
    ]);
    println!("{table}");
}

fn print_parse_failures(failures: &[ParseFailure]) {
    if failures.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Column"),
        header_cell("Nulled"),
        header_cell("Examples"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for failure in failures {
        let examples = failure.examples.join(", ");
        table.add_row(vec![
            Cell::new(&failure.table),
            Cell::new(&failure.column),
            count_cell(Some(failure.count), Color::Red),
            Cell::new(redact_value(&examples)),
        ]);
    }
    println!();
    println!("Unparseable values:");
    println!("{table}");
}

fn print_mismatches(mismatches: &[CatalogMismatch]) {
    if mismatches.is_empty() {
        return;
    }
    println!();
    println!("Catalog entries with no matching column:");
    for mismatch in mismatches {
        println!(
            "  {:>3}  {}  ({})",
            mismatch.ordinal_position, mismatch.region_label, mismatch.output_column
        );
    }
}

fn state_cell(stage: &StageReport) -> Cell {
    match stage.state {
        Some(state) if state.is_terminal() => Cell::new(format!("{state:?}")).fg(Color::Green),
        Some(state) => Cell::new(format!("{state:?}")),
        None => dim_cell("-"),
    }
}

fn reasons_cell(stage: &StageReport) -> Cell {
    if stage.drops.is_empty() {
        return dim_cell("-");
    }
    let reasons = stage
        .drops
        .iter()
        .map(|(reason, count)| format!("{reason}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    Cell::new(reasons)
}

pub fn count_cell(count: Option<usize>, color: Color) -> Cell {
    match count {
        Some(value) if value > 0 => Cell::new(value).fg(color).add_attribute(Attribute::Bold),
        Some(value) => dim_cell(value),
        None => dim_cell("-"),
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

pub fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
