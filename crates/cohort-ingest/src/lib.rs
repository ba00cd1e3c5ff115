//! Cohort data ingestion.
//!
//! Reads the CSV inputs of a linkage run into polars DataFrames with
//! canonical headers, an `Int64` subject key and `Date` columns. Values that
//! do not parse become null and are counted in an
//! [`IngestReport`](cohort_model::IngestReport). Also loads the region
//! catalog and the TOML config file.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use cohort_ingest::{load_config, load_sources};
//!
//! let config = load_config(Path::new("cohort.toml"))?;
//! let (sources, report) = load_sources(Path::new("data"), &config.sources)?;
//! ```

mod catalog;
mod coerce;
mod config;
mod error;
mod loader;
mod table;

// === Error Types ===
pub use error::{IngestError, Result};

// === Table Reading ===
pub use coerce::{coerce_date, coerce_subject_key, parse_date};
pub use loader::{DATE_FIELDS, LoadedSources, LoadedTable, load_sources, load_table};
pub use table::{normalize_header, normalize_headers, read_csv_table, validate_encoding};

// === Catalog and Config ===
pub use catalog::load_region_catalog;
pub use config::load_config;
