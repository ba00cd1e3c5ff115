//! Canonical column names shared by every source table.
//!
//! Ingestion upper-cases and trims headers, so these are the names the
//! linkage stages look for.

pub const RID: &str = "RID";
pub const VISCODE: &str = "VISCODE";
pub const VISCODE2: &str = "VISCODE2";
pub const SCANDATE: &str = "SCANDATE";
pub const EXAMDATE: &str = "EXAMDATE";
pub const EXAMDATE_BL: &str = "EXAMDATE_BL";
pub const QC_FLAG: &str = "QC_FLAG";
pub const TRACER: &str = "TRACER";
pub const AGE: &str = "AGE";
pub const DX: &str = "DX";
pub const GENOTYPE: &str = "GENOTYPE";

/// Derived columns.
pub const APOE4: &str = "APOE4";
pub const AGE_AT_SCAN: &str = "AGE_AT_SCAN";
pub const AMY_TAU_SCANDIFF_DAYS: &str = "AMY_TAU_SCANDIFF_DAYS";

/// Region catalog columns.
pub const FS_LABEL: &str = "FS_LABEL";
pub const SUBCORTICAL: &str = "SUBCORTICAL";

/// Suffix marking a regional measurement column.
pub const SUVR_SUFFIX: &str = "_SUVR";

/// Column name with a suffix appended, e.g. `suffixed("SCANDATE", "_TAU")`.
pub fn suffixed(name: &str, suffix: &str) -> String {
    format!("{name}{suffix}")
}
