//! Region catalog: the fixed, ordered list of regional measurement columns.
//!
//! The catalog defines the output schema independently of any one dataset
//! release. Subcortical exclusion is a per-entry flag, resolved by lookup.

use serde::{Deserialize, Serialize};

use crate::fields::SUVR_SUFFIX;

/// Catalog positions historically treated as subcortical when the catalog
/// file carries no explicit flag column.
pub const LEGACY_SUBCORTICAL_POSITIONS: [usize; 16] =
    [34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 46, 47, 48, 83];

/// One region in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCatalogEntry {
    /// Label as written in the catalog (e.g. `ctx-lh-bankssts`).
    pub region_label: String,
    /// Normalized measurement column (e.g. `CTX_LH_BANKSSTS_SUVR`).
    pub output_column: String,
    /// Zero-based position in the catalog file.
    pub ordinal_position: usize,
    pub is_subcortical: bool,
}

impl RegionCatalogEntry {
    pub fn new(region_label: impl Into<String>, ordinal_position: usize, is_subcortical: bool) -> Self {
        let region_label = region_label.into();
        let output_column = region_output_column(&region_label);
        Self {
            region_label,
            output_column,
            ordinal_position,
            is_subcortical,
        }
    }
}

/// Ordered region catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCatalog {
    entries: Vec<RegionCatalogEntry>,
}

impl RegionCatalog {
    /// Builds a catalog, ordering entries by their ordinal position.
    pub fn new(mut entries: Vec<RegionCatalogEntry>) -> Self {
        entries.sort_by_key(|entry| entry.ordinal_position);
        Self { entries }
    }

    /// Builds a catalog from bare labels, flagging the given positions as subcortical.
    pub fn from_labels<S: AsRef<str>>(labels: &[S], subcortical_positions: &[usize]) -> Self {
        let entries = labels
            .iter()
            .enumerate()
            .map(|(position, label)| {
                RegionCatalogEntry::new(
                    label.as_ref(),
                    position,
                    subcortical_positions.contains(&position),
                )
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[RegionCatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries kept in the output, in catalog order.
    pub fn cortical(&self) -> impl Iterator<Item = &RegionCatalogEntry> {
        self.entries.iter().filter(|entry| !entry.is_subcortical)
    }

    /// Looks up an entry by its normalized output column.
    pub fn by_output_column(&self, column: &str) -> Option<&RegionCatalogEntry> {
        self.entries.iter().find(|entry| entry.output_column == column)
    }
}

/// Normalizes a catalog label to the measurement column name used by the
/// imaging tables: `-` becomes `_`, letters are upper-cased, `_SUVR` appended.
///
/// # Examples
///
/// ```
/// use cohort_model::region_output_column;
///
/// assert_eq!(region_output_column("ctx-lh-bankssts"), "CTX_LH_BANKSSTS_SUVR");
/// assert_eq!(region_output_column(" Left-Amygdala "), "LEFT_AMYGDALA_SUVR");
/// ```
pub fn region_output_column(label: &str) -> String {
    let mut column = label.trim().replace('-', "_").to_uppercase();
    column.push_str(SUVR_SUFFIX);
    column
}
