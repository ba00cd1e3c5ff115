//! Named table snapshots.
//!
//! A [`SourceFrame`] pairs a polars `DataFrame` with the name of the table it
//! came from, so a schema complaint can say which source is broken. Stages
//! never mutate a frame they receive; they return a new one.

use polars::prelude::{Column, DataFrame};

use cohort_model::StageReport;

use crate::error::{LinkError, Result};

/// An immutable table snapshot with its source name.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    /// Source table name (e.g. "registry", "taupet").
    pub name: String,
    pub data: DataFrame,
}

impl SourceFrame {
    pub fn new(name: impl Into<String>, data: DataFrame) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Same source name, new contents.
    #[must_use]
    pub fn with_data(&self, data: DataFrame) -> Self {
        Self {
            name: self.name.clone(),
            data,
        }
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn width(&self) -> usize {
        self.data.width()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.data.column(name).is_ok()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Looks up a column, failing with a schema error naming this table.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.data
            .column(name)
            .map_err(|_| LinkError::schema(&self.name, name))
    }

    /// Fails with a schema error on the first absent field.
    pub fn require<S: AsRef<str>>(&self, fields: &[S]) -> Result<()> {
        for field in fields {
            self.column(field.as_ref())?;
        }
        Ok(())
    }
}

/// Result of one pipeline stage: the new snapshot plus its row accounting.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub frame: SourceFrame,
    pub report: StageReport,
}

impl StageOutput {
    pub fn new(frame: SourceFrame, mut report: StageReport) -> Self {
        report.finish(frame.height());
        Self { frame, report }
    }
}
