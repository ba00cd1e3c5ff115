use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, Table};
use tracing::{info, info_span};

use cohort_cli::pipeline::{OutputPaths, link_data_dir, load_catalog, write_outputs};
use cohort_ingest::load_config;
use cohort_model::{CohortConfig, MatchDirection};

use crate::cli::{DirectionArg, LinkArgs, RegionsArgs};
use crate::summary::{align_column, apply_table_style, dim_cell, header_cell};
use crate::types::LinkResult;

pub fn run_regions(args: &RegionsArgs) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Label"),
        header_cell("Output column"),
        header_cell("Subcortical"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    for entry in catalog.entries() {
        let subcortical = if entry.is_subcortical {
            Cell::new("yes")
        } else {
            dim_cell("no")
        };
        table.add_row(vec![
            Cell::new(entry.ordinal_position),
            Cell::new(&entry.region_label),
            Cell::new(&entry.output_column),
            subcortical,
        ]);
    }
    println!("{table}");
    println!(
        "{} regions, {} cortical",
        catalog.len(),
        catalog.cortical().count()
    );
    Ok(())
}

pub fn run_link(args: &LinkArgs) -> Result<LinkResult> {
    let data_dir = &args.data_dir;
    let span = info_span!("link", data_dir = %data_dir.display());
    let _guard = span.enter();

    let mut config = match &args.config {
        Some(path) => {
            load_config(path).with_context(|| format!("load config {}", path.display()))?
        }
        None => CohortConfig::default(),
    };
    apply_overrides(&mut config, args);

    let run = link_data_dir(data_dir, &config)?;

    let mut paths = OutputPaths::in_data_dir(data_dir);
    if let Some(output) = &args.output {
        paths.cohort_csv = output.clone();
    }
    paths.report_json = args.report.clone();

    if args.dry_run {
        info!("dry run, no files written");
        return Ok(LinkResult {
            data_dir: data_dir.clone(),
            output: None,
            report_path: None,
            report: run.report,
        });
    }
    write_outputs(&run, &paths)?;
    Ok(LinkResult {
        data_dir: data_dir.clone(),
        output: Some(paths.cohort_csv),
        report_path: paths.report_json,
        report: run.report,
    })
}

/// Command-line flags win over the config file.
fn apply_overrides(config: &mut CohortConfig, args: &LinkArgs) {
    let options = &mut config.options;
    if let Some(days) = args.tolerance_days {
        options.tolerance_days = days;
    }
    if let Some(code) = &args.qc_pass {
        options.primary.qc.pass_value = code.clone();
        options.secondary.qc.pass_value = code.clone();
    }
    if !args.exclude_tracer.is_empty() {
        options.primary.qc.excluded_categories = args.exclude_tracer.clone();
    }
    if let Some(direction) = args.direction {
        options.direction = match direction {
            DirectionArg::Nearest => MatchDirection::Nearest,
            DirectionArg::Backward => MatchDirection::Backward,
            DirectionArg::Forward => MatchDirection::Forward,
        };
    }
}
