//! Configuration options for cohort linkage.
//!
//! Every default reproduces the tau/amyloid linkage the cohort was first
//! assembled with. A TOML config only needs to name what differs.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ModelError, Result};
use crate::fields;

/// Which right-hand record a nearest join may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchDirection {
    /// Smallest absolute gap; equal gaps resolve to the earlier record.
    #[default]
    Nearest,
    /// Latest record at or before the left timestamp.
    Backward,
    /// Earliest record at or after the left timestamp.
    Forward,
}

/// Whether unmatched left rows survive a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    /// Left outer: unmatched left rows get null right fields.
    #[default]
    #[serde(alias = "outer")]
    Left,
    /// Unmatched left rows are dropped.
    Inner,
}

/// Which duplicate survives deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeepPolicy {
    First,
    #[default]
    Last,
}

/// Which side leads the exact visit-code merge of PET values and scan metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetAnchor {
    /// PET values are the left table; metadata columns are attached.
    Scan,
    /// Visit-annotated metadata is the left table; PET values are attached.
    Metadata,
}

/// Pass/fail quality rule for one scan table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcRule {
    /// Column holding the QC code. A table without it is not filtered.
    pub field: String,
    /// Exact passing value, compared in canonical text form.
    pub pass_value: String,
    /// Column holding the category (tracer) label.
    pub category_field: String,
    /// Categories dropped regardless of QC outcome.
    pub excluded_categories: Vec<String>,
}

impl Default for QcRule {
    fn default() -> Self {
        Self {
            field: fields::QC_FLAG.to_string(),
            pass_value: "2".to_string(),
            category_field: fields::TRACER.to_string(),
            excluded_categories: Vec::new(),
        }
    }
}

impl QcRule {
    pub fn new(field: impl Into<String>, pass_value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            pass_value: pass_value.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn excluding(mut self, categories: &[&str]) -> Self {
        self.excluded_categories = categories.iter().map(|c| (*c).to_string()).collect();
        self
    }
}

/// Linkage settings for one imaging modality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalityOptions {
    /// Display name used in logs and reports (e.g. "TAU").
    pub name: String,
    /// Suffix applied to colliding columns in the cross-modality join.
    pub tag: String,
    pub qc: QcRule,
    /// Keys joining scan metadata to its QC sheet.
    pub metadata_keys: Vec<String>,
    /// QC sheet columns carried into the metadata.
    pub qc_columns: Vec<String>,
    /// Collapse metadata to one row per (subject, scan date), first wins.
    pub dedupe_metadata: bool,
    /// Keys of the exact visit-code merge between PET values and metadata.
    pub pet_keys: Vec<String>,
    pub pet_anchor: PetAnchor,
    pub pet_join: JoinKind,
    /// PET columns that must be non-null before the merge.
    pub pet_required: Vec<String>,
    /// Suffix for colliding columns of the attached side of the PET merge.
    pub pet_suffix: String,
}

impl ModalityOptions {
    /// Tau-PET defaults: metadata joined to QC by visit, PET values lead.
    pub fn tau() -> Self {
        Self {
            name: "TAU".to_string(),
            tag: "_TAU".to_string(),
            qc: QcRule::new(fields::QC_FLAG, "2").excluding(&["MK6240"]),
            metadata_keys: vec![fields::RID.to_string(), fields::VISCODE.to_string()],
            qc_columns: vec![
                fields::RID.to_string(),
                fields::VISCODE.to_string(),
                fields::VISCODE2.to_string(),
                fields::SCANDATE.to_string(),
            ],
            dedupe_metadata: false,
            pet_keys: vec![fields::RID.to_string(), fields::VISCODE.to_string()],
            pet_anchor: PetAnchor::Scan,
            pet_join: JoinKind::Left,
            pet_required: Vec::new(),
            pet_suffix: "_TAUINFO".to_string(),
        }
    }

    /// Amyloid-PET defaults: metadata joined to QC by subject, metadata leads.
    pub fn amyloid() -> Self {
        Self {
            name: "AMY".to_string(),
            tag: "_AMY".to_string(),
            qc: QcRule::new(fields::QC_FLAG, "2"),
            metadata_keys: vec![fields::RID.to_string()],
            qc_columns: vec![
                fields::RID.to_string(),
                fields::SCANDATE.to_string(),
                fields::VISCODE.to_string(),
                fields::VISCODE2.to_string(),
            ],
            dedupe_metadata: true,
            pet_keys: vec![fields::RID.to_string(), fields::VISCODE.to_string()],
            pet_anchor: PetAnchor::Metadata,
            pet_join: JoinKind::Inner,
            pet_required: vec![
                fields::RID.to_string(),
                fields::VISCODE.to_string(),
                fields::SCANDATE.to_string(),
            ],
            pet_suffix: "_AMYPET".to_string(),
        }
    }

    /// Scan date column name after the cross-modality rename.
    pub fn scan_date_column(&self) -> String {
        fields::suffixed(fields::SCANDATE, &self.tag)
    }
}

/// A modality table as written in a config file; absent fields keep the base.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModalityPatch {
    name: Option<String>,
    tag: Option<String>,
    qc: Option<QcPatch>,
    metadata_keys: Option<Vec<String>>,
    qc_columns: Option<Vec<String>>,
    dedupe_metadata: Option<bool>,
    pet_keys: Option<Vec<String>>,
    pet_anchor: Option<PetAnchor>,
    pet_join: Option<JoinKind>,
    pet_required: Option<Vec<String>>,
    pet_suffix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QcPatch {
    field: Option<String>,
    pass_value: Option<String>,
    category_field: Option<String>,
    excluded_categories: Option<Vec<String>>,
}

fn replace<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl QcPatch {
    fn apply(self, mut base: QcRule) -> QcRule {
        replace(&mut base.field, self.field);
        replace(&mut base.pass_value, self.pass_value);
        replace(&mut base.category_field, self.category_field);
        replace(&mut base.excluded_categories, self.excluded_categories);
        base
    }
}

impl ModalityPatch {
    fn apply(self, mut base: ModalityOptions) -> ModalityOptions {
        replace(&mut base.name, self.name);
        replace(&mut base.tag, self.tag);
        if let Some(qc) = self.qc {
            base.qc = qc.apply(base.qc);
        }
        replace(&mut base.metadata_keys, self.metadata_keys);
        replace(&mut base.qc_columns, self.qc_columns);
        replace(&mut base.dedupe_metadata, self.dedupe_metadata);
        replace(&mut base.pet_keys, self.pet_keys);
        replace(&mut base.pet_anchor, self.pet_anchor);
        replace(&mut base.pet_join, self.pet_join);
        replace(&mut base.pet_required, self.pet_required);
        replace(&mut base.pet_suffix, self.pet_suffix);
        base
    }
}

fn tau_modality<'de, D>(deserializer: D) -> std::result::Result<ModalityOptions, D::Error>
where
    D: Deserializer<'de>,
{
    ModalityPatch::deserialize(deserializer).map(|patch| patch.apply(ModalityOptions::tau()))
}

fn amyloid_modality<'de, D>(deserializer: D) -> std::result::Result<ModalityOptions, D::Error>
where
    D: Deserializer<'de>,
{
    ModalityPatch::deserialize(deserializer).map(|patch| patch.apply(ModalityOptions::amyloid()))
}

/// Options for the whole linkage run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkOptions {
    /// Modality every output row is anchored on.
    #[serde(deserialize_with = "tau_modality")]
    pub primary: ModalityOptions,
    /// Modality aligned to the primary under the tolerance gate.
    #[serde(deserialize_with = "amyloid_modality")]
    pub secondary: ModalityOptions,
    /// Registry columns attached by the nearest-visit stage.
    pub registry_fields: Vec<String>,
    pub registry_suffix: String,
    /// Assessment columns attached when present in the assessment table.
    pub assessment_fields: Vec<String>,
    pub assessment_suffix: String,
    /// Columns that must be non-null for a primary scan to stay in the cohort.
    pub required_covariates: Vec<String>,
    /// Exclusive upper bound on |secondary - primary| scan gap, in days.
    pub tolerance_days: i64,
    pub direction: MatchDirection,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            primary: ModalityOptions::tau(),
            secondary: ModalityOptions::amyloid(),
            registry_fields: vec![
                fields::VISCODE.to_string(),
                fields::VISCODE2.to_string(),
                fields::EXAMDATE.to_string(),
            ],
            registry_suffix: "_REG".to_string(),
            assessment_fields: vec![
                fields::VISCODE.to_string(),
                fields::EXAMDATE.to_string(),
                fields::EXAMDATE_BL.to_string(),
                fields::AGE.to_string(),
                fields::DX.to_string(),
            ],
            assessment_suffix: "_ADNI".to_string(),
            required_covariates: vec![fields::APOE4.to_string(), fields::DX.to_string()],
            tolerance_days: 365,
            direction: MatchDirection::Nearest,
        }
    }
}

impl LinkOptions {
    /// Reject option sets that cannot produce a meaningful cohort.
    pub fn validate(&self) -> Result<()> {
        if self.tolerance_days <= 0 {
            return Err(ModelError::InvalidOption {
                option: "tolerance_days".to_string(),
                reason: format!("must be positive, got {}", self.tolerance_days),
            });
        }
        if self.primary.tag == self.secondary.tag {
            return Err(ModelError::InvalidOption {
                option: "tag".to_string(),
                reason: format!("modalities share the tag {:?}", self.primary.tag),
            });
        }
        require_suffix("registry_suffix", &self.registry_suffix)?;
        require_suffix("assessment_suffix", &self.assessment_suffix)?;
        for modality in [&self.primary, &self.secondary] {
            require_suffix(&format!("{}.tag", modality.name), &modality.tag)?;
            require_suffix(&format!("{}.pet_suffix", modality.name), &modality.pet_suffix)?;
            if modality.metadata_keys.is_empty() || modality.pet_keys.is_empty() {
                return Err(ModelError::InvalidOption {
                    option: format!("{}.metadata_keys/pet_keys", modality.name),
                    reason: "join keys must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Column tags the region selector recognises, untagged first.
    pub fn modality_tags(&self) -> Vec<String> {
        vec![
            String::new(),
            self.primary.tag.clone(),
            self.secondary.tag.clone(),
        ]
    }
}

/// Join suffixes rename colliding columns, so an empty one leaves duplicates.
fn require_suffix(option: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ModelError::InvalidOption {
            option: option.to_string(),
            reason: "suffix must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Input file names, relative to the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePaths {
    pub tau_meta: PathBuf,
    pub tau_qc: PathBuf,
    pub tau_pet: PathBuf,
    pub amy_meta: PathBuf,
    pub amy_qc: PathBuf,
    pub amy_pet: PathBuf,
    pub registry: PathBuf,
    pub assessments: PathBuf,
    pub genotypes: PathBuf,
    pub regions: PathBuf,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            tau_meta: "taumeta.csv".into(),
            tau_qc: "tau_qc.csv".into(),
            tau_pet: "taupet.csv".into(),
            amy_meta: "amymeta.csv".into(),
            amy_qc: "amyqc.csv".into(),
            amy_pet: "amy_data.csv".into(),
            registry: "registry.csv".into(),
            assessments: "ADNIMERGE.csv".into(),
            genotypes: "apoe4.csv".into(),
            regions: "fs_region.csv".into(),
        }
    }
}

/// Top-level config file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortConfig {
    pub sources: SourcePaths,
    pub options: LinkOptions,
}
