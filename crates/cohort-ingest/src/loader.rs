//! Loading every input of a run from one data directory.

use std::path::Path;

use polars::prelude::DataFrame;
use tracing::{debug, info, info_span};

use cohort_model::{IngestReport, RegionCatalog, SourcePaths, fields};

use crate::catalog::load_region_catalog;
use crate::coerce::{coerce_date, coerce_subject_key};
use crate::error::Result;
use crate::table::read_csv_table;

/// Columns parsed as dates wherever they appear.
pub const DATE_FIELDS: [&str; 3] = [fields::SCANDATE, fields::EXAMDATE, fields::EXAMDATE_BL];

/// A loaded source table and the name reports use for it.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub name: String,
    pub data: DataFrame,
}

/// All inputs of a run, typed and ready for linkage.
#[derive(Debug, Clone)]
pub struct LoadedSources {
    pub tau_meta: LoadedTable,
    pub tau_qc: LoadedTable,
    pub tau_pet: LoadedTable,
    pub amy_meta: LoadedTable,
    pub amy_qc: LoadedTable,
    pub amy_pet: LoadedTable,
    pub registry: LoadedTable,
    pub assessments: LoadedTable,
    pub genotypes: LoadedTable,
    pub catalog: RegionCatalog,
}

/// Report name of a table: its file stem (e.g. `taupet` for `taupet.csv`).
fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reads one table, casting the subject key to `Int64` and date columns to `Date`.
pub fn load_table(path: &Path, report: &mut IngestReport) -> Result<LoadedTable> {
    let name = table_name(path);
    let mut data = read_csv_table(path)?;
    coerce_subject_key(&mut data, &name, fields::RID, report)?;
    for field in DATE_FIELDS {
        coerce_date(&mut data, &name, field, report)?;
    }
    debug!(
        table = %name,
        rows = data.height(),
        columns = data.width(),
        "table loaded"
    );
    report.tables.insert(name.clone(), data.height());
    Ok(LoadedTable { name, data })
}

/// Loads the ten inputs named by `paths`, relative to `data_dir`.
pub fn load_sources(data_dir: &Path, paths: &SourcePaths) -> Result<(LoadedSources, IngestReport)> {
    let span = info_span!("ingest", data_dir = %data_dir.display());
    let _guard = span.enter();

    let mut report = IngestReport::default();
    let mut load = |relative: &Path| load_table(&data_dir.join(relative), &mut report);
    let sources = LoadedSources {
        tau_meta: load(&paths.tau_meta)?,
        tau_qc: load(&paths.tau_qc)?,
        tau_pet: load(&paths.tau_pet)?,
        amy_meta: load(&paths.amy_meta)?,
        amy_qc: load(&paths.amy_qc)?,
        amy_pet: load(&paths.amy_pet)?,
        registry: load(&paths.registry)?,
        assessments: load(&paths.assessments)?,
        genotypes: load(&paths.genotypes)?,
        catalog: load_region_catalog(&data_dir.join(&paths.regions))?,
    };
    info!(
        tables = report.tables.len(),
        parse_failures = report.total_parse_failures(),
        regions = sources.catalog.len(),
        "sources loaded"
    );
    Ok((sources, report))
}
