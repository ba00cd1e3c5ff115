//! Cohort run pipeline with explicit stages.
//!
//! 1. **Ingest**: read the ten inputs of a data directory into typed frames
//! 2. **Link**: align both modalities and gate the cross-modality pairs
//! 3. **Output**: write the cohort CSV and, optionally, the JSON run report
//!
//! Each stage takes the output of the previous one and returns typed results.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use tracing::{debug, info, info_span, trace, warn};

use cohort_ingest::{LoadedSources, LoadedTable, load_region_catalog, load_sources};
use cohort_link::{CohortOutput, CohortSources, ModalitySources, SourceFrame, link_cohort};
use cohort_model::{CohortConfig, IngestReport, RegionCatalog, RunReport};

use crate::logging::redact_value;

/// Default file name of the linked cohort, written into the data directory.
pub const DEFAULT_OUTPUT_FILE: &str = "final_matched_dataset.csv";

// ============================================================================
// Stage 1: Ingest
// ============================================================================

/// Typed inputs plus the catalog that lays out the region columns.
#[derive(Debug)]
pub struct IngestResult {
    pub sources: CohortSources,
    pub catalog: RegionCatalog,
    pub report: IngestReport,
}

fn frame(table: LoadedTable) -> SourceFrame {
    SourceFrame::new(table.name, table.data)
}

/// Regroups loaded tables by the role they play in linkage.
pub fn cohort_sources(loaded: LoadedSources) -> (CohortSources, RegionCatalog) {
    let sources = CohortSources {
        primary: ModalitySources {
            metadata: frame(loaded.tau_meta),
            qc: frame(loaded.tau_qc),
            pet: frame(loaded.tau_pet),
        },
        secondary: ModalitySources {
            metadata: frame(loaded.amy_meta),
            qc: frame(loaded.amy_qc),
            pet: frame(loaded.amy_pet),
        },
        registry: frame(loaded.registry),
        assessments: frame(loaded.assessments),
        genotypes: frame(loaded.genotypes),
    };
    (sources, loaded.catalog)
}

/// Loads every input named by `config.sources` from `data_dir`.
pub fn ingest(data_dir: &Path, config: &CohortConfig) -> Result<IngestResult> {
    let (loaded, report) = load_sources(data_dir, &config.sources)
        .with_context(|| format!("load inputs from {}", data_dir.display()))?;
    for failure in &report.parse_failures {
        let examples = failure.examples.join(", ");
        warn!(
            table = %failure.table,
            column = %failure.column,
            count = failure.count,
            examples = %redact_value(&examples),
            "values set to null"
        );
    }
    let (sources, catalog) = cohort_sources(loaded);
    Ok(IngestResult {
        sources,
        catalog,
        report,
    })
}

// ============================================================================
// Stage 2: Link
// ============================================================================

/// A linked cohort with the full row accounting of its run.
#[derive(Debug)]
pub struct LinkRun {
    pub output: CohortOutput,
    pub report: RunReport,
}

/// Runs ingest and linkage for one data directory.
pub fn link_data_dir(data_dir: &Path, config: &CohortConfig) -> Result<LinkRun> {
    let span = info_span!("run", data_dir = %data_dir.display());
    let _guard = span.enter();
    let start = Instant::now();

    config.options.validate().context("validate options")?;
    let ingested = ingest(data_dir, config)?;
    let output = link_cohort(&ingested.sources, &ingested.catalog, &config.options)
        .context("link cohort")?;

    let mut report = output.run_report();
    report.ingest = ingested.report;
    if tracing::enabled!(tracing::Level::TRACE) {
        trace_subjects(&output.frame);
    }
    info!(
        rows = report.output_rows,
        columns = report.output_columns,
        elapsed_ms = start.elapsed().as_millis(),
        "run complete"
    );
    Ok(LinkRun { output, report })
}

fn trace_subjects(frame: &SourceFrame) {
    let Ok(column) = frame.column(cohort_model::fields::RID) else {
        return;
    };
    for idx in 0..column.len() {
        let subject = column.get(idx).map(|value| value.to_string()).unwrap_or_default();
        trace!(row = idx, subject = %redact_value(&subject), "linked subject");
    }
}

// ============================================================================
// Stage 3: Output
// ============================================================================

/// Where a run writes its results.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub cohort_csv: PathBuf,
    pub report_json: Option<PathBuf>,
}

impl OutputPaths {
    /// The default cohort CSV inside `data_dir`, no JSON report.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self {
            cohort_csv: data_dir.join(DEFAULT_OUTPUT_FILE),
            report_json: None,
        }
    }
}

/// Writes the cohort as CSV with a header row and ISO dates.
pub fn write_cohort_csv(data: &DataFrame, path: &Path) -> Result<()> {
    let mut data = data.clone();
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut data)
        .with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), rows = data.height(), "cohort written");
    Ok(())
}

/// Writes the run report as pretty-printed JSON.
pub fn write_run_report(report: &RunReport, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), "run report written");
    Ok(())
}

/// Writes every output of a run.
pub fn write_outputs(run: &LinkRun, paths: &OutputPaths) -> Result<()> {
    write_cohort_csv(&run.output.frame.data, &paths.cohort_csv)?;
    if let Some(report_path) = &paths.report_json {
        write_run_report(&run.report, report_path)?;
    }
    Ok(())
}

/// Loads a region catalog on its own, for `cohort regions`.
pub fn load_catalog(path: &Path) -> Result<RegionCatalog> {
    load_region_catalog(path).with_context(|| format!("load region catalog {}", path.display()))
}
