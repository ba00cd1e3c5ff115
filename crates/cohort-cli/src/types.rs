use std::path::PathBuf;

use cohort_model::RunReport;

/// Result of a `cohort link` run.
#[derive(Debug)]
pub struct LinkResult {
    pub data_dir: PathBuf,
    /// Cohort CSV, or None for a dry run.
    pub output: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub report: RunReport,
}

impl LinkResult {
    pub fn shape(&self) -> (usize, usize) {
        (self.report.output_rows, self.report.output_columns)
    }
}
