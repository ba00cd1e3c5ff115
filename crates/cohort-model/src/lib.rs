//! Data model for longitudinal PET cohort linkage.
//!
//! Plain types shared by ingestion, the linkage engine and the CLI: canonical
//! field names, run options, the region catalog and run reports.

pub mod catalog;
pub mod error;
pub mod fields;
pub mod options;
pub mod report;

pub use catalog::{
    LEGACY_SUBCORTICAL_POSITIONS, RegionCatalog, RegionCatalogEntry, region_output_column,
};
pub use error::{ModelError, Result};
pub use options::{
    CohortConfig, JoinKind, KeepPolicy, LinkOptions, MatchDirection, ModalityOptions, PetAnchor,
    QcRule, SourcePaths,
};
pub use report::{
    CatalogMismatch, DropReason, IngestReport, ParseFailure, RunReport, ScanState, StageReport,
};
