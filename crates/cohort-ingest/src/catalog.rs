//! Region catalog loading.

use std::fs::File;
use std::path::Path;

use tracing::{info, warn};

use cohort_model::{LEGACY_SUBCORTICAL_POSITIONS, RegionCatalog, RegionCatalogEntry, fields};

use crate::table::normalize_header;
use crate::error::{IngestError, Result};

/// Reads the region catalog from a CSV file.
///
/// `FS_LABEL` is required. An optional `SUBCORTICAL` column flags entries
/// explicitly; without it the legacy subcortical positions are applied.
/// Rows with a blank label keep their position but are not catalogued.
pub fn load_region_catalog(path: &Path) -> Result<RegionCatalog> {
    let file = File::open(path).map_err(|e| IngestError::open(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let csv_error = |e: csv::Error| IngestError::CsvParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(normalize_header)
        .collect();
    let label_idx = headers
        .iter()
        .position(|h| h == fields::FS_LABEL)
        .ok_or_else(|| IngestError::MissingColumn {
            column: fields::FS_LABEL.to_string(),
            path: path.to_path_buf(),
        })?;
    let flag_idx = headers.iter().position(|h| h == fields::SUBCORTICAL);

    let mut entries = Vec::new();
    for (position, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let label = record.get(label_idx).unwrap_or("").trim();
        if label.is_empty() {
            continue;
        }
        let is_subcortical = match flag_idx {
            Some(idx) => parse_flag(record.get(idx).unwrap_or(""), path)?,
            None => LEGACY_SUBCORTICAL_POSITIONS.contains(&position),
        };
        entries.push(RegionCatalogEntry::new(label, position, is_subcortical));
    }

    if flag_idx.is_none() {
        warn!(
            path = %path.display(),
            "catalog has no SUBCORTICAL column; using legacy subcortical positions"
        );
    }
    let catalog = RegionCatalog::new(entries);
    info!(
        path = %path.display(),
        regions = catalog.len(),
        cortical = catalog.cortical().count(),
        "region catalog loaded"
    );
    Ok(catalog)
}

/// Parses a subcortical flag; blank means cortical.
fn parse_flag(value: &str, path: &Path) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "y" | "yes" => Ok(true),
        "" | "0" | "false" | "n" | "no" => Ok(false),
        _ => Err(IngestError::InvalidValue {
            field: fields::SUBCORTICAL.to_string(),
            value: value.to_string(),
            path: path.to_path_buf(),
        }),
    }
}
