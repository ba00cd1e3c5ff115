//! Run reports: what every stage kept, and why it dropped the rest.
//!
//! Per-row problems never abort a run. They are counted here so a summary
//! can say "N rows dropped for missing timestamp" instead of rows vanishing.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a row left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingSubjectKey,
    MissingTimestamp,
    MissingRequiredField,
    QcFailed,
    ExcludedCategory,
    Duplicate,
    NoMatch,
    MissingCovariate,
    NoCrossModalityMatch,
    ToleranceRejection,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::MissingSubjectKey => "missing subject key",
            DropReason::MissingTimestamp => "missing timestamp",
            DropReason::MissingRequiredField => "missing required field",
            DropReason::QcFailed => "failed QC",
            DropReason::ExcludedCategory => "excluded category",
            DropReason::Duplicate => "duplicate",
            DropReason::NoMatch => "no match",
            DropReason::MissingCovariate => "missing covariate",
            DropReason::NoCrossModalityMatch => "no cross-modality scan",
            DropReason::ToleranceRejection => "outside tolerance",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a primary scan record.
///
/// `Raw → QcPassed → VisitMatched → AssessmentMatched → CrossModalityMatched
/// → {Accepted | RejectedByGap}`. Rows dropped on the way never come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Raw,
    QcPassed,
    VisitMatched,
    AssessmentMatched,
    CrossModalityMatched,
    Accepted,
    RejectedByGap,
}

impl ScanState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanState::Accepted | ScanState::RejectedByGap)
    }
}

/// Row accounting for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    /// State reached by rows that survive this stage, if it is a lifecycle step.
    pub state: Option<ScanState>,
    pub input_rows: usize,
    pub output_rows: usize,
    pub drops: BTreeMap<DropReason, usize>,
}

impl StageReport {
    pub fn new(stage: impl Into<String>, input_rows: usize) -> Self {
        Self {
            stage: stage.into(),
            state: None,
            input_rows,
            output_rows: input_rows,
            drops: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: ScanState) -> Self {
        self.state = Some(state);
        self
    }

    /// Adds `count` drops for `reason`; zero counts are not recorded.
    pub fn record_drop(&mut self, reason: DropReason, count: usize) {
        if count > 0 {
            *self.drops.entry(reason).or_insert(0) += count;
        }
    }

    pub fn finish(&mut self, output_rows: usize) {
        self.output_rows = output_rows;
    }

    pub fn dropped(&self, reason: DropReason) -> usize {
        self.drops.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_dropped(&self) -> usize {
        self.drops.values().sum()
    }
}

/// Values that failed to parse during ingestion and were read as null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub table: String,
    pub column: String,
    pub count: usize,
    /// First few offending values, kept for diagnostics.
    pub examples: Vec<String>,
}

/// Ingestion outcome for all source tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Rows read per table.
    pub tables: BTreeMap<String, usize>,
    pub parse_failures: Vec<ParseFailure>,
}

impl IngestReport {
    pub fn total_parse_failures(&self) -> usize {
        self.parse_failures.iter().map(|failure| failure.count).sum()
    }
}

/// Catalog entry that matched no column of the final table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMismatch {
    pub region_label: String,
    pub output_column: String,
    pub ordinal_position: usize,
}

/// Everything a finished run reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub ingest: IngestReport,
    pub stages: Vec<StageReport>,
    pub catalog_mismatches: Vec<CatalogMismatch>,
    pub output_rows: usize,
    pub output_columns: usize,
}

impl RunReport {
    /// Total rows dropped for `reason` across all stages.
    pub fn dropped(&self, reason: DropReason) -> usize {
        self.stages.iter().map(|stage| stage.dropped(reason)).sum()
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|stage| stage.stage == name)
    }
}
