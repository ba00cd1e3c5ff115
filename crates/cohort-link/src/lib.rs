//! Temporal record linkage for longitudinal PET cohorts.
//!
//! The engine works on polars `DataFrame`s wrapped in [`SourceFrame`]s:
//!
//! - [`filter_qc`] drops failed or excluded acquisitions;
//! - [`match_nearest`] pairs each row with the closest-in-time row of the same
//!   subject;
//! - [`merge_on_keys`] is the exact visit-code merge;
//! - [`dedupe`], [`drop_incomplete`] and [`tolerance_gate`] reduce rows;
//! - [`select_regions`] lays out the final measurement columns.
//!
//! [`link_cohort`] runs the whole pipeline. Every stage returns a new frame
//! and a [`cohort_model::StageReport`] saying how many rows it dropped and why.

mod columns;
pub mod align;
pub mod dedupe;
pub mod derive;
pub mod error;
pub mod frame;
pub mod gate;
pub mod genotype;
pub mod merge;
pub mod nearest;
pub mod pipeline;
pub mod qc;
pub mod regions;

pub use align::{ModalityAligner, ModalitySources, StageLog};
pub use columns::JoinSuffixes;
pub use dedupe::dedupe;
pub use derive::{age_at_scan, coalesce_suffixed, rename_column, scan_gap_days};
pub use error::{LinkError, Result};
pub use frame::{SourceFrame, StageOutput};
pub use gate::{drop_incomplete, tolerance_gate};
pub use genotype::{GENOTYPE_RISK, apoe4_table, genotype_risk};
pub use merge::{KeyedMerge, merge_on_keys};
pub use nearest::{NearestJoin, match_nearest, pick_nearest};
pub use pipeline::{CohortOutput, CohortSources, link_cohort};
pub use qc::filter_qc;
pub use regions::{RegionSelection, plan_region_columns, select_regions};
